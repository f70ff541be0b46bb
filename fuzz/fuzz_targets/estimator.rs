#![no_main]

use hll_stream::hash::{Fnv1a32, PolyHash32, DEFAULT_FNV_BASE, DEFAULT_HASH_SEED};
use hll_stream::{HashFunction, HyperLogLog};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fn check<H: HashFunction>(precision: u8, hasher: H, data: &[u8]) {
    let mut estimator = HyperLogLog::new(precision, hasher).unwrap();
    let max_rank = (32 - u32::from(precision) + 1) as u8;
    for chunk in data.chunks(4) {
        let before = estimator.registers().to_vec();
        estimator.add(chunk);
        let after = estimator.registers();
        assert!(before.iter().zip(after).all(|(old, new)| new >= old && *new <= max_rank));
        assert!(before.iter().zip(after).filter(|(old, new)| old != new).count() <= 1);

        let estimate = estimator.estimate();
        assert!(estimate.is_finite() && estimate > 0.0);
    }

    estimator.reset();
    assert_eq!(estimator.estimate(), 0.0);
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = 4 + (wyhash(data, 0) % 13) as u8;
    check(precision, PolyHash32::default(), data);
    check(precision, Fnv1a32::new(DEFAULT_FNV_BASE, DEFAULT_HASH_SEED), data);
});
