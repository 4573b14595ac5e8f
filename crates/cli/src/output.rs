// SPDX-License-Identifier: MIT

//! Shared rendering helpers for command output: `--format text|json`
//! (grounded on the teacher's `OutputFormat` enum) and relative-time
//! formatting for timestamps printed in text mode.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty-print `value` as JSON, used by every command's `--format json` path.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a timestamp as relative time (e.g. "5s", "2m", "1h", "3d"),
/// grounded on the teacher's `format_time_ago` helper, rebased on
/// `chrono::DateTime<Utc>` instead of epoch milliseconds.
pub fn format_time_ago(at: DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - at).num_seconds().max(0);
    if elapsed < 60 {
        format!("{elapsed}s")
    } else if elapsed < 3600 {
        format!("{}m", elapsed / 60)
    } else if elapsed < 86_400 {
        format!("{}h", elapsed / 3600)
    } else {
        format!("{}d", elapsed / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn format_time_ago_buckets_by_magnitude() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now - Duration::seconds(5)), "5s");
        assert_eq!(format_time_ago(now - Duration::minutes(2)), "2m");
        assert_eq!(format_time_ago(now - Duration::hours(1)), "1h");
        assert_eq!(format_time_ago(now - Duration::days(3)), "3d");
    }
}
