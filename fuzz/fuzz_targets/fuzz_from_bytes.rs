#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(f) = mbloom::Filter::from_bytes(data) {
        assert_eq!(f.to_bytes(), data);
        assert!(f.num_words().is_power_of_two());
        f.test(data);
    }
});
