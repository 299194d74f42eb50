#![no_main]

use chorus_delay::stats::AveragingMethod;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Reinterpret the bytes as f64 samples, NaN and infinities included
    let values: Vec<f64> = data
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect();

    // Every method must return a value or an error, never panic
    for method in [
        AveragingMethod::Median,
        AveragingMethod::Mean,
        AveragingMethod::Gmean,
        AveragingMethod::Peak,
    ] {
        let _ = method.estimate(&values);
    }
});
