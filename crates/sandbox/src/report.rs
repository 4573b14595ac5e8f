// SPDX-License-Identifier: MIT

//! Output artifact shape and parsing (spec.md §4.2: "read the expected
//! output artifact (a structured report plus log)... on parse failure,
//! record stdout tail in the error message").

use crate::error::SandboxError;
use sf_core::{InstrumentBreakdown, Metrics};
use serde::Deserialize;

pub const REPORT_FILENAME: &str = "report.json";
pub const LOG_FILENAME: &str = "run.log";

/// Parsed executor output, pre-persistence. `sf-scheduler` attaches
/// `job_id`/`strategy_id`/timestamps to turn this into a
/// [`sf_core::BacktestResult`].
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub metrics: Metrics,
    pub per_instrument: InstrumentBreakdown,
    pub raw_log: String,
    pub trade_ledger: Option<serde_json::Value>,
}

/// On-disk shape of `report.json`, written by the backtest runner image.
#[derive(Debug, Deserialize)]
struct RawReport {
    metrics: Metrics,
    #[serde(default)]
    per_instrument: InstrumentBreakdown,
    #[serde(default)]
    trade_ledger: Option<serde_json::Value>,
}

/// Parse the two output artifacts into a [`BacktestReport`]. On malformed
/// JSON, the last `tail_lines` of `log` are folded into the error so the
/// caller can record a useful failure reason without keeping the whole log.
pub fn parse_report(report_json: &str, log: &str, tail_lines: usize) -> Result<BacktestReport, SandboxError> {
    let raw: RawReport = serde_json::from_str(report_json).map_err(|e| {
        SandboxError::Parse(format!("{e}; log tail: {}", tail(log, tail_lines)))
    })?;
    Ok(BacktestReport {
        metrics: raw.metrics,
        per_instrument: raw.per_instrument,
        raw_log: log.to_string(),
        trade_ledger: raw.trade_ledger,
    })
}

fn tail(log: &str, lines: usize) -> String {
    let all: Vec<&str> = log.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_report() {
        let json = r#"{"metrics":{"total_trades":12,"winning_trades":7,"losing_trades":5,
            "win_rate":0.583,"total_profit":1200.5,"profit_pct":12.0,"profit_factor":1.8,
            "max_drawdown":300.0,"max_drawdown_pct":5.0,"sharpe_ratio":1.4,"sortino_ratio":1.9,
            "calmar_ratio":2.4,"avg_trade_duration_secs":3600.0,"avg_winning_duration_secs":4000.0,
            "avg_losing_duration_secs":2800.0,"best_trade_pct":6.0,"worst_trade_pct":-3.0}}"#;
        let report = parse_report(json, "line one\nline two\n", 10).unwrap();
        assert_eq!(report.metrics.total_trades, 12);
        assert_eq!(report.raw_log, "line one\nline two\n");
    }

    #[test]
    fn malformed_report_carries_log_tail_in_the_error() {
        let log: String = (0..20).map(|i| format!("log line {i}\n")).collect();
        let err = parse_report("not json", &log, 3).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("log line 19"));
        assert!(!message.contains("log line 0\n"));
    }
}
