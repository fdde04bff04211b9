#![feature(test)]
extern crate test;

use mbloom::*;
use test::Bencher;

const FOX: &str = "The quick brown fox jumps over the lazy dog.";

#[bench]
fn bench_new(b: &mut Bencher) {
    b.iter(|| Filter::new(1000, 200));
}

#[bench]
fn bench_hash(b: &mut Bencher) {
    b.iter(|| murmur3_x64_128(test::black_box(FOX.as_bytes())));
}

#[bench]
fn bench_add(b: &mut Bencher) {
    let mut f = Filter::new(1 << 20, 200);
    b.iter(|| f.add_str(FOX));
}

#[bench]
fn bench_add_bytes(b: &mut Bencher) {
    let mut f = Filter::new(1 << 20, 200);
    let bytes = FOX.as_bytes();
    b.iter(|| f.add(bytes));
}

#[bench]
fn bench_test_ok_medium(b: &mut Bencher) {
    let mut f = Filter::new(100000, 100);
    for i in 0..100000u64 {
        f.add(&i.to_le_bytes());
    }
    let mut i = 0u64;
    b.iter(|| {
        i = (i + 1) % 100000;
        f.test(&i.to_le_bytes())
    })
}

#[bench]
fn bench_test_nok_medium(b: &mut Bencher) {
    let mut f = Filter::new(100000, 100);
    for i in 0..100000u64 {
        f.add(&i.to_le_bytes());
    }
    let mut i = 100000u64;
    b.iter(|| {
        i += 1;
        f.test(&i.to_le_bytes())
    })
}

#[bench]
fn bench_contains(b: &mut Bencher) {
    let mut f = Filter::new(100000, 100);
    for i in 0..100000u64 {
        f.insert(&i);
    }
    let mut i = 0u64;
    b.iter(|| {
        i += 1;
        f.contains(&i)
    })
}

#[bench]
fn bench_union(b: &mut Bencher) {
    let f1 = Filter::new(1000, 200);
    let f2 = Filter::new(1000, 200);
    b.iter(|| f1.union(&f2).unwrap());
}

#[bench]
fn bench_to_from_bytes(b: &mut Bencher) {
    let mut f = Filter::new(10000, 100);
    for i in 0..10000u64 {
        f.add(&i.to_le_bytes());
    }
    b.iter(|| Filter::from_bytes(&f.to_bytes()).unwrap());
}
