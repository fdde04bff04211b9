#![no_main]
use libfuzzer_sys::fuzz_target;
use std::hash::Hasher;

fuzz_target!(|data: (Vec<u8>, Vec<u8>)| {
    let (data, cuts) = data;
    let expected = mbloom::murmur3_x64_128(&data);
    let mut hasher = mbloom::Murmur3Hasher::new();
    let mut rest = &data[..];
    for &c in &cuts {
        let (head, tail) = rest.split_at((c as usize).min(rest.len()));
        hasher.write(head);
        rest = tail;
    }
    hasher.write(rest);
    assert_eq!(hasher.finish128(), expected);
    if let Ok(s) = std::str::from_utf8(&data) {
        assert_eq!(mbloom::murmur3_x64_128_str(s), expected);
    }
});
