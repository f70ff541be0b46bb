use hll_stream::hash::{Fnv1a32, PolyHash32, DEFAULT_FNV_BASE, DEFAULT_HASH_SEED};
use hll_stream::HyperLogLog;

fn main() {
    let mut poly = HyperLogLog::new(12, PolyHash32::default()).unwrap();
    let mut fnv = HyperLogLog::new(12, Fnv1a32::new(DEFAULT_FNV_BASE, DEFAULT_HASH_SEED)).unwrap();
    for i in 0..10_000 {
        let value = format!("{:08x}", (i as u32).wrapping_mul(0x9e37_79b1));
        poly.add(&value);
        fnv.add(&value);
    }
    println!("poly estimate = {:.1}", poly.estimate());
    println!("fnv1a estimate = {:.1}", fnv.estimate());

    fnv.reset();
    println!("fnv1a estimate after reset = {:.1}", fnv.estimate());
}
