// SPDX-License-Identifier: MIT

//! Integration tests against a real Postgres, provisioned per-test by
//! `sqlx::test` (migrated from `./migrations`). Exercises the invariants
//! that matter most under concurrency and constraint violation, not
//! mechanical round-trips.

use crate::{StorageError, Store};
use chrono::{Duration, Utc};
use sf_core::{
    BacktestConfig, BacktestJob, ControlAction, Criteria, DomainError, OptimizationConfig,
    OptimizationMode, OptimizationRun, ScoutRun, Stake, Strategy, TriggerType,
};

fn sample_strategy(name: &str) -> Strategy {
    Strategy::new_root(name, format!("fn entry() {{ /* {name} */ }}"), Utc::now())
}

fn sample_config() -> BacktestConfig {
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

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_fingerprint_is_rejected(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let a = sample_strategy("macd-cross");
    let mut b = sample_strategy("macd-cross-copy");
    b.code = a.code.clone();
    b.fingerprint = a.fingerprint.clone();

    store.submit_strategy(&a).await.unwrap();
    let err = store.submit_strategy(&b).await.unwrap_err();
    assert!(matches!(err, StorageError::Domain(DomainError::Duplicate { entity: "strategy", .. })));
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_pending_is_exclusive_under_concurrent_claimers(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let strategy = sample_strategy("breakout");
    store.submit_strategy(&strategy).await.unwrap();

    let now = Utc::now();
    for i in 0..10 {
        let job = BacktestJob::new(strategy.id, sample_config(), i, now);
        store.submit_job(&job).await.unwrap();
    }

    let (first, second) = tokio::join!(store.claim_pending(5, now), store.claim_pending(5, now));
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.len() + second.len(), 10);
    let mut ids: Vec<_> = first.iter().chain(second.iter()).map(|j| j.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10, "no job may be claimed twice");

    let stats = store.queue_stats().await.unwrap();
    assert_eq!(stats.pending_jobs, 0);
    assert_eq!(stats.running_jobs, 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn reap_timeouts_finds_stale_running_jobs(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let strategy = sample_strategy("reaper-target");
    store.submit_strategy(&strategy).await.unwrap();

    let stale_start = Utc::now() - Duration::hours(2);
    let job = BacktestJob::new(strategy.id, sample_config(), 0, stale_start);
    store.submit_job(&job).await.unwrap();
    store.mark_running(job.id, &sf_core::SandboxHandle("container-1".into()), stale_start).await.unwrap();

    let reaped = store.reap_timeouts(Duration::minutes(30), Utc::now()).await.unwrap();
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].id, job.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn run_state_update_rejects_invalid_transitions(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let strategy = sample_strategy("state-machine-subject");
    store.submit_strategy(&strategy).await.unwrap();

    let config = OptimizationConfig {
        backtest: sample_config(),
        criteria: Criteria {
            min_sharpe: 1.0,
            min_profit_pct: 0.0,
            max_drawdown_pct: 50.0,
            min_trades: 10,
            min_win_rate: 0.4,
        },
        mode: OptimizationMode::Balanced,
        max_iterations: 20,
    };
    let run = OptimizationRun::new("alpha-search", strategy.id, config, Utc::now());
    store.submit_run(&run).await.unwrap();

    let err = store
        .run_state_update(run.id, ControlAction::Resume, None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Domain(DomainError::OptimizationNotRunning(_))));

    let started = store
        .run_state_update(run.id, ControlAction::Cancel, Some("operator abort"), Utc::now())
        .await
        .unwrap();
    assert_eq!(started.status, sf_core::RunStatus::Cancelled);
    assert!(started.completed_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn only_one_scout_run_may_be_active(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let first = ScoutRun::new(TriggerType::Manual, "stratninja", None, Utc::now());
    store.create_scout_run(&first).await.unwrap();

    let second = ScoutRun::new(TriggerType::Scheduled, "quantconnect-feed", None, Utc::now());
    let err = store.create_scout_run(&second).await.unwrap_err();
    assert!(matches!(err, StorageError::Domain(DomainError::ScoutRunActive)));

    store.cancel_scout_run(first.id, Utc::now()).await.unwrap();
    store.create_scout_run(&second).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn get_lineage_respects_depth_and_avoids_revisiting(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let root = sample_strategy("root");
    store.submit_strategy(&root).await.unwrap();

    let mut parent = root.clone();
    for gen in 1..=3u32 {
        let child = Strategy::new_child(format!("gen-{gen}"), format!("code-{gen}"), parent.id, parent.generation, Utc::now());
        store.submit_strategy(&child).await.unwrap();
        parent = child;
    }

    let lineage = store.get_lineage(root.id, 2).await.unwrap();
    assert_eq!(lineage.level, 0);
    assert_eq!(lineage.children.len(), 1);
    assert_eq!(lineage.children[0].children.len(), 1);
    assert!(lineage.children[0].children[0].children.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_strategy_blocked_while_referenced_by_a_job(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let strategy = sample_strategy("in-use");
    store.submit_strategy(&strategy).await.unwrap();
    let job = BacktestJob::new(strategy.id, sample_config(), 0, Utc::now());
    store.submit_job(&job).await.unwrap();

    let err = store.delete_strategy(strategy.id).await.unwrap_err();
    assert!(matches!(err, StorageError::Domain(DomainError::ResourceInUse(_))));
}
