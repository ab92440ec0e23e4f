//! Display helpers shared by the list and dashboard views.

pub mod file_upload;

use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::stores::execution::parse_timestamp;

/// Human-readable duration for a number of **seconds**, e.g. `1分5秒`,
/// `2小时`, `0秒`.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0秒".to_string();
    }
    if seconds < 60 {
        return format!("{}秒", seconds);
    }
    if seconds < 3600 {
        let (minutes, rest) = (seconds / 60, seconds % 60);
        return if rest > 0 {
            format!("{}分{}秒", minutes, rest)
        } else {
            format!("{}分", minutes)
        };
    }
    let (hours, minutes) = (seconds / 3600, (seconds % 3600) / 60);
    if minutes > 0 {
        format!("{}小时{}分", hours, minutes)
    } else {
        format!("{}小时", hours)
    }
}

/// `YYYY/MM/DD HH:MM:SS` in the browser's local time zone.  Empty for
/// missing or unreadable input.
pub fn format_date_time(raw: Option<&str>) -> String {
    render(raw, |dt| dt.with_timezone(&Local).format("%Y/%m/%d %H:%M:%S").to_string())
}

/// [`format_date_time`] against a fixed offset.
pub fn format_date_time_in(raw: Option<&str>, offset: FixedOffset) -> String {
    render(raw, |dt| dt.with_timezone(&offset).format("%Y/%m/%d %H:%M:%S").to_string())
}

fn render(raw: Option<&str>, show: impl FnOnce(DateTime<Utc>) -> String) -> String {
    raw.filter(|s| !s.is_empty())
        .and_then(parse_timestamp)
        .map(show)
        .unwrap_or_default()
}

/// Thousands-separated number with at most three decimals: `1,234,567`,
/// `12,345.5`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
