#![no_main]
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

fuzz_target!(|data: (u16, u16, Vec<Vec<u8>>)| {
    let (n, p, items) = data;
    let mut f = mbloom::Filter::new(n as u64, p as u64);
    let mut g = mbloom::Filter::new(n as u64, p as u64);
    let mut seen = HashSet::new();
    for (i, item) in items.iter().enumerate() {
        let count = f.count();
        let member = f.add(item);
        if seen.contains(item) {
            assert!(member);
        }
        assert_eq!(f.count(), if member { count } else { count + 1 });
        seen.insert(item.clone());
        if i % 2 == 0 {
            g.add(item);
        }
        for e in &items[..=i] {
            assert!(f.test(e));
        }
    }
    let or = f.union(&g).unwrap();
    for item in &items {
        assert!(or.test(item));
    }
    assert!(or.count() >= 0);
});
