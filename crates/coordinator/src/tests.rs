// SPDX-License-Identifier: MIT

//! Integration tests against a real Postgres, provisioned per-test by
//! `sqlx::test` (mirrors `sf-storage`'s own test style).

use crate::Coordinator;
use chrono::Utc;
use sf_core::{
    ApprovalState, BacktestConfig, ControlAction, Criteria, Metrics, OptimizationConfig,
    OptimizationMode, OptimizationRun, RunStatus, Stake, Strategy,
};
use sf_eventbus::testing::RecordingPublisher;
use sf_eventbus::EventPublisher;
use sf_storage::Store;
use sf_wire::routing_key;
use std::sync::Arc;

fn sample_strategy(name: &str) -> Strategy {
    Strategy::new_root(name, format!("fn entry() {{ /* {name} */ }}"), Utc::now())
}

fn sample_backtest_config() -> BacktestConfig {
    BacktestConfig {
        venue: "binance".into(),
        symbols: vec!["BTC/USDT".into()],
        timeframe: "1h".into(),
        start: "2024-01-01".into(),
        end: "2024-06-01".into(),
        initial_wallet: 1000.0,
        max_open_trades: 3,
        stake: Stake::Amount(100.0),
    }
}

fn sample_run(base_strategy_id: sf_core::StrategyId, max_iterations: u32) -> OptimizationRun {
    let config = OptimizationConfig {
        backtest: sample_backtest_config(),
        criteria: Criteria { min_sharpe: 1.0, min_profit_pct: 0.0, max_drawdown_pct: 50.0, min_trades: 1, min_win_rate: 0.0 },
        mode: OptimizationMode::MaximizeSharpe,
        max_iterations,
    };
    let mut run = OptimizationRun::new("sharpe hunt", base_strategy_id, config, Utc::now());
    run.status = RunStatus::Running;
    run
}

async fn coordinator(store: Arc<Store>) -> (Coordinator, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let coordinator = Coordinator::new(store, publisher.clone() as Arc<dyn EventPublisher>);
    (coordinator, publisher)
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn submitting_an_iteration_enqueues_a_job_and_advances_the_count(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy("base");
    store.submit_strategy(&strategy).await.unwrap();
    let run = sample_run(strategy.id, 10);
    store.submit_run(&run).await.unwrap();

    let (coordinator, publisher) = coordinator(store.clone()).await;
    let iteration = coordinator
        .submit_iteration(run.id, strategy.id, 0, Some("tweaked stop loss".into()))
        .await
        .unwrap();

    assert_eq!(iteration.iteration_number, 1);
    let job = store.get_job(iteration.job_id).await.unwrap();
    assert_eq!(job.optimization_run_id, Some(run.id));

    let reloaded = store.get_run(run.id).await.unwrap();
    assert_eq!(reloaded.current_iteration, 1);
    assert_eq!(reloaded.status, RunStatus::Running);

    assert_eq!(publisher.routing_keys(), vec![routing_key::OPTIMIZATION_ITERATION_STARTED]);
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn reaching_max_iterations_auto_completes_the_run(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy("base");
    store.submit_strategy(&strategy).await.unwrap();
    let run = sample_run(strategy.id, 1);
    store.submit_run(&run).await.unwrap();

    let (coordinator, publisher) = coordinator(store.clone()).await;
    coordinator.submit_iteration(run.id, strategy.id, 0, None).await.unwrap();

    let reloaded = store.get_run(run.id).await.unwrap();
    assert_eq!(reloaded.status, RunStatus::Completed);
    assert_eq!(reloaded.termination_reason.as_deref(), Some("max_iterations reached"));
    assert!(publisher.routing_keys().contains(&routing_key::OPTIMIZATION_COMPLETED));
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn a_criteria_passing_result_becomes_the_incumbent_and_emits_new_best(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy("base");
    store.submit_strategy(&strategy).await.unwrap();
    let run = sample_run(strategy.id, 10);
    store.submit_run(&run).await.unwrap();

    let (coordinator, publisher) = coordinator(store.clone()).await;
    let iteration = coordinator.submit_iteration(run.id, strategy.id, 0, None).await.unwrap();

    let metrics = Metrics { sharpe_ratio: 2.0, profit_pct: 10.0, max_drawdown_pct: 5.0, total_trades: 20, win_rate: 0.6, ..Metrics::default() };
    let result = sf_core::BacktestResult::new(iteration.job_id, strategy.id, metrics, Default::default(), "log".into(), None, Utc::now());
    store.create_result(&result).await.unwrap();

    let updated = coordinator
        .record_feedback(iteration.id, Some(result.id), Some("looks solid"), ApprovalState::Approved)
        .await
        .unwrap();
    assert_eq!(updated.approval, ApprovalState::Approved);

    let reloaded = store.get_run(run.id).await.unwrap();
    assert_eq!(reloaded.best_result_id, Some(result.id));
    assert_eq!(reloaded.best_strategy_id, Some(strategy.id));

    let keys = publisher.routing_keys();
    assert!(keys.contains(&routing_key::OPTIMIZATION_NEW_BEST));
    assert!(keys.contains(&routing_key::OPTIMIZATION_ITERATION_COMPLETED));
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn a_result_that_fails_criteria_never_becomes_the_incumbent(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy("base");
    store.submit_strategy(&strategy).await.unwrap();
    let run = sample_run(strategy.id, 10);
    store.submit_run(&run).await.unwrap();

    let (coordinator, publisher) = coordinator(store.clone()).await;
    let iteration = coordinator.submit_iteration(run.id, strategy.id, 0, None).await.unwrap();

    // min_sharpe is 1.0; this result falls short.
    let metrics = Metrics { sharpe_ratio: 0.2, profit_pct: 10.0, max_drawdown_pct: 5.0, total_trades: 20, win_rate: 0.6, ..Metrics::default() };
    let result = sf_core::BacktestResult::new(iteration.job_id, strategy.id, metrics, Default::default(), "log".into(), None, Utc::now());
    store.create_result(&result).await.unwrap();

    coordinator
        .record_feedback(iteration.id, Some(result.id), None, ApprovalState::Rejected)
        .await
        .unwrap();

    let reloaded = store.get_run(run.id).await.unwrap();
    assert_eq!(reloaded.best_result_id, None);
    assert!(!publisher.routing_keys().contains(&routing_key::OPTIMIZATION_NEW_BEST));
}

#[sqlx::test(migrations = "../storage/migrations")]
async fn control_actions_validate_transitions_and_publish_terminal_events(pool: sqlx::PgPool) {
    let store = Arc::new(Store::from_pool(pool));
    let strategy = sample_strategy("base");
    store.submit_strategy(&strategy).await.unwrap();
    let run = sample_run(strategy.id, 10);
    store.submit_run(&run).await.unwrap();

    let (coordinator, publisher) = coordinator(store.clone()).await;

    let paused = coordinator.control(run.id, ControlAction::Pause, None).await.unwrap();
    assert_eq!(paused.status, RunStatus::Paused);

    // Resume is valid from PAUSED; Pause is not (not RUNNING).
    assert!(coordinator.control(run.id, ControlAction::Pause, None).await.is_err());
    let resumed = coordinator.control(run.id, ControlAction::Resume, None).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Running);

    let failed = coordinator
        .control(run.id, ControlAction::Fail, Some("external policy abort"))
        .await
        .unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(publisher.routing_keys().contains(&routing_key::OPTIMIZATION_FAILED));
}
