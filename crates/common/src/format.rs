//! Render-time formatting helpers. Every function here is pure.

use crate::model::LoadAverage;

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;

/// Base-1024 size with two decimals, e.g. `1536.0` -> `"1.50 KB"`.
///
/// Zero (and anything that is not a positive finite number) maps to `"0 B"`.
/// Values past the TB range stay in TB.
pub fn format_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 B".to_string();
    }
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, BYTE_UNITS[unit])
}

/// Byte rate, e.g. `"1.00 MB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

/// Uptime bucketed by day, hour or minute. Thresholds are inclusive and
/// lower units are truncated.
pub fn format_uptime(seconds: u64) -> String {
    if seconds >= SECS_PER_DAY {
        let days = seconds / SECS_PER_DAY;
        let hours = (seconds % SECS_PER_DAY) / SECS_PER_HOUR;
        format!("{days}天{hours}小时")
    } else if seconds >= SECS_PER_HOUR {
        let hours = seconds / SECS_PER_HOUR;
        let minutes = (seconds % SECS_PER_HOUR) / 60;
        format!("{hours}小时{minutes}分钟")
    } else {
        format!("{}分钟", seconds / 60)
    }
}

pub fn format_load(load: &LoadAverage) -> String {
    format!("{:.2} / {:.2} / {:.2}", load.load1, load.load5, load.load15)
}

pub fn format_celsius(value: f64) -> String {
    format!("{value:.1}°C")
}
