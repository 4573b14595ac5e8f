use super::*;

fn metrics(sharpe: f64, profit_pct: f64, drawdown_pct: f64) -> Metrics {
    Metrics {
        sharpe_ratio: sharpe,
        profit_pct,
        max_drawdown_pct: drawdown_pct,
        total_trades: 100,
        win_rate: 0.6,
        ..Metrics::default()
    }
}

fn loose_criteria() -> Criteria {
    Criteria { min_sharpe: 0.0, min_profit_pct: 0.0, max_drawdown_pct: 100.0, min_trades: 0, min_win_rate: 0.0 }
}

#[test]
fn pause_then_resume_round_trips() {
    let s = apply_transition(RunStatus::Running, ControlAction::Pause).unwrap();
    assert_eq!(s, RunStatus::Paused);
    let s = apply_transition(s, ControlAction::Resume).unwrap();
    assert_eq!(s, RunStatus::Running);
}

#[test]
fn cancel_from_any_nonterminal_state() {
    for start in [RunStatus::Pending, RunStatus::Running, RunStatus::Paused] {
        assert_eq!(apply_transition(start, ControlAction::Cancel).unwrap(), RunStatus::Cancelled);
    }
}

#[test]
fn cancel_from_terminal_state_is_rejected() {
    for start in [RunStatus::Completed, RunStatus::Cancelled, RunStatus::Failed] {
        assert!(apply_transition(start, ControlAction::Cancel).is_err());
    }
}

#[test]
fn complete_is_idempotent() {
    let s = apply_transition(RunStatus::Running, ControlAction::Complete).unwrap();
    assert_eq!(s, RunStatus::Completed);
    let s = apply_transition(s, ControlAction::Complete).unwrap();
    assert_eq!(s, RunStatus::Completed);
}

#[test]
fn pause_from_pending_is_rejected() {
    assert!(apply_transition(RunStatus::Pending, ControlAction::Pause).is_err());
}

#[test]
fn maximize_sharpe_requires_strict_improvement() {
    let criteria = loose_criteria();
    let incumbent = metrics(1.5, 10.0, 5.0);
    assert!(!is_better(OptimizationMode::MaximizeSharpe, &criteria, &incumbent, &metrics(1.5, 50.0, 1.0)));
    assert!(is_better(OptimizationMode::MaximizeSharpe, &criteria, &incumbent, &metrics(1.6, 1.0, 50.0)));
}

#[test]
fn candidate_failing_criteria_never_wins() {
    let criteria = Criteria { min_sharpe: 2.0, ..loose_criteria() };
    let incumbent = metrics(0.0, 0.0, 0.0);
    let candidate = metrics(1.9, 99.0, 0.1);
    assert!(!is_better(OptimizationMode::MaximizeSharpe, &criteria, &incumbent, &candidate));
}

#[test]
fn balanced_mode_uses_composite_score() {
    let criteria = loose_criteria();
    let incumbent = metrics(1.0, 10.0, 10.0); // score = 1 - 5 + 1 = -3
    let candidate = metrics(1.0, 10.0, 2.0); // score = 1 - 1 + 1 = 1
    assert!(is_better(OptimizationMode::Balanced, &criteria, &incumbent, &candidate));
}

#[test]
fn reached_max_iterations() {
    let config = OptimizationConfig {
        backtest: crate::backtest::BacktestConfig {
            venue: "binance".into(),
            symbols: vec!["BTC/USDT".into()],
            timeframe: "1h".into(),
            start: "2024-01-01".into(),
            end: "2024-02-01".into(),
            initial_wallet: 1000.0,
            max_open_trades: 1,
            stake: crate::backtest::Stake::Unlimited,
        },
        criteria: loose_criteria(),
        mode: OptimizationMode::MaximizeSharpe,
        max_iterations: 3,
    };
    let mut run = OptimizationRun::new("r1", StrategyId::new(), config, Utc::now());
    assert!(!run.reached_max_iterations());
    run.current_iteration = 3;
    assert!(run.reached_max_iterations());
}
