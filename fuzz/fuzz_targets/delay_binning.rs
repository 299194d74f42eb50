#![no_main]

use chorus_delay::chorus::simpson;
use chorus_delay::stats::{BinningConfig, DelayBinner};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let values: Vec<f64> = data
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect();
    let (delay, power) = values.split_at(values.len() / 2);
    let power = &power[..delay.len()];

    let _ = simpson(power, delay);

    let binner = DelayBinner::new(BinningConfig::default());
    if let Ok(bins) = binner.bin(delay, power) {
        assert_eq!(bins.len(), BinningConfig::default().bin_count());
    }
});
