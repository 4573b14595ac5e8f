use super::*;

fn valid_config() -> BacktestConfig {
    BacktestConfig {
        venue: "binance".into(),
        symbols: vec!["BTC/USDT".into()],
        timeframe: "1h".into(),
        start: "2024-01-01".into(),
        end: "2024-02-01".into(),
        initial_wallet: 1000.0,
        max_open_trades: 3,
        stake: Stake::Unlimited,
    }
}

#[test]
fn rejects_empty_symbols() {
    let mut cfg = valid_config();
    cfg.symbols.clear();
    assert!(cfg.validate(0.0).is_err());
}

#[test]
fn rejects_empty_time_range() {
    let mut cfg = valid_config();
    cfg.end = cfg.start.clone();
    assert!(cfg.validate(0.0).is_err());
}

#[test]
fn rejects_wallet_below_venue_minimum() {
    let cfg = valid_config();
    assert!(cfg.validate(5000.0).is_err());
}

#[test]
fn accepts_valid_config() {
    let cfg = valid_config();
    assert!(cfg.validate(0.0).is_ok());
}

#[test]
fn new_job_starts_pending_and_cancellable() {
    let job = BacktestJob::new(StrategyId::new(), valid_config(), 5, Utc::now());
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.is_cancellable());
}

#[test]
fn terminal_statuses_are_not_cancellable() {
    for status in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
        let mut job = BacktestJob::new(StrategyId::new(), valid_config(), 5, Utc::now());
        job.status = status;
        assert!(!job.is_cancellable(), "{status} should not be cancellable");
        assert!(status.is_terminal());
    }
}
