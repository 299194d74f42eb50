// Integration test fixtures
//
// One synthetic substorm on 2017-03-01: the index is quiet for 20 minutes,
// sits at 600 for 20 minutes, then stays at 50 for an hour. After 6-sample
// smoothing the quiet time runs from 00:42 to 01:39 with the injection
// starting at 00:18. Probe rbspa sits at L = 5 the whole time with a flat
// chorus spectrum of 1e-6 in every channel and a 100 nT field.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const PROBE: &str = "rbspa";
pub const DAY: &str = "2017-03-01";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 3, 1, 0, 0, 0).unwrap()
}

pub fn minute(m: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(m)
}

/// Raw index values, one per minute from 00:00
pub fn index_values() -> Vec<f64> {
    let mut values = vec![100.0; 20];
    values.extend(vec![600.0; 20]);
    values.extend(vec![50.0; 60]);
    values
}

pub fn write_index_csv(dir: &Path) -> PathBuf {
    let path = dir.join("sme.csv");
    let mut csv = String::from("# synthetic auroral index\ntime,sme\n");
    for (m, v) in index_values().iter().enumerate() {
        csv.push_str(&format!(
            "{},{}\n",
            minute(m as i64).format("%Y-%m-%d %H:%M:%S"),
            v
        ));
    }
    std::fs::write(&path, csv).unwrap();
    path
}

/// Two hours of one-minute ephemeris for rbspa
pub fn write_ephemeris(dir: &Path) -> PathBuf {
    let path = dir.join("ephemeris.json");
    let times: Vec<DateTime<Utc>> = (0..=120).map(minute).collect();
    let n = times.len();
    let ephemeris = json!([{
        "probe": PROBE,
        "time": times,
        "l": vec![5.0; n],
        "mlt": vec![3.0; n],
        "mlat": vec![1.0; n],
    }]);
    std::fs::write(&path, serde_json::to_string(&ephemeris).unwrap()).unwrap();
    path
}

/// Channels 100, 300, ..., 2700 Hz
pub fn frequencies() -> Vec<f64> {
    (0..14).map(|k| 100.0 + 200.0 * k as f64).collect()
}

/// Day file for rbspa covering 00:00 to 02:00
pub fn write_day(root: &Path, power: f64) -> PathBuf {
    let probe_dir = root.join(PROBE);
    std::fs::create_dir_all(&probe_dir).unwrap();
    let path = probe_dir.join(format!("{DAY}.json"));

    let times: Vec<DateTime<Utc>> = (0..=120).map(minute).collect();
    let n = times.len();
    let rows = vec![vec![power; n]; frequencies().len()];
    let day = json!({
        "time": times,
        "frequency": frequencies(),
        "b_power": rows,
        "e_power": rows,
        "density": vec![1.0; n],
        "b_mag_time": times,
        "b_mag": vec![100.0; n],
        "l": vec![5.0; n],
        "mlt": vec![3.0; n],
        "mlat": vec![1.0; n],
    });
    std::fs::write(&path, serde_json::to_string(&day).unwrap()).unwrap();
    path
}
