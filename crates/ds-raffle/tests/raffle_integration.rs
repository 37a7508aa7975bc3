//! Raffle end to end on real engines.

use std::sync::Arc;

use approx::assert_abs_diff_eq;

use ds_compute::{PoolConfig, SynchronousEngine, WorkerPool};
use ds_core::{ComputeEngine, Error};
use ds_raffle::{CompoundOptions, PrizeSpec, Raffle, RaffleConfig, TaskOptions};

fn coin_flip() -> RaffleConfig {
    RaffleConfig { prizes: vec![PrizeSpec::new(0.0, 1.0), PrizeSpec::new(1.0, 1.0)], ..Default::default() }
}

fn pool() -> Arc<dyn ComputeEngine> {
    Arc::new(WorkerPool::new(PoolConfig { workers: 2, ..PoolConfig::default() }).unwrap())
}

#[tokio::test]
async fn calculates_probabilities() {
    let raffle = Raffle::new(coin_flip(), Arc::new(SynchronousEngine::new())).unwrap();
    let result = raffle.enter(1).unwrap().await.unwrap();
    assert_abs_diff_eq!(result.range_probability(0.5, 1.5), 0.5, epsilon = 1e-6);
}

#[tokio::test]
async fn calculates_repeated_runs() {
    let raffle = Raffle::new(coin_flip(), Arc::new(SynchronousEngine::new())).unwrap();
    let one = raffle.enter(1).unwrap().await.unwrap();
    let two = one.pow(2, TaskOptions::default()).unwrap().await.unwrap();
    assert_abs_diff_eq!(two.range_probability(1.5, 2.5), 0.25, epsilon = 1e-6);
}

#[tokio::test]
async fn pool_and_sync_agree() {
    let config = RaffleConfig {
        audience: Some(50_000.0),
        prizes: vec![
            PrizeSpec::new(1_000.0, 5.0),
            PrizeSpec::new(100.0, 40.0),
            PrizeSpec::new(25.0, 1_200.0),
        ],
        ..Default::default()
    };
    let sync = Raffle::new(config.clone(), Arc::new(SynchronousEngine::new())).unwrap();
    let pooled = Raffle::new(config, pool()).unwrap();

    for tickets in [1u64, 10, 250] {
        let a = sync.enter(tickets).unwrap().await.unwrap();
        let b = pooled.enter(tickets).unwrap().await.unwrap();
        assert_eq!(a.distribution().len(), b.distribution().len());
        assert_abs_diff_eq!(a.mean(), b.mean(), epsilon = 1e-9);
        // each ticket is worth 5,000 + 4,000 + 30,000 over 50,000
        assert_abs_diff_eq!(a.mean(), tickets as f64 * 0.78, epsilon = 1e-6);
    }
}

#[tokio::test]
async fn concurrent_entries_on_pool() {
    let config = RaffleConfig::with_audience(10_000.0, vec![PrizeSpec::new(50.0, 20.0), PrizeSpec::new(5.0, 300.0)]);
    let raffle = Raffle::new(config, pool()).unwrap();

    let pending: Vec<_> = (1..=6u64).map(|n| raffle.enter(n * 10).unwrap()).collect();
    let results = futures::future::try_join_all(pending).await.unwrap();
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.tickets(), (i as u64 + 1) * 10);
        assert_abs_diff_eq!(r.distribution().entries().map(|e| e.p).sum::<f64>(), 1.0, epsilon = 1e-9);
    }
    assert_eq!(raffle.cached_entries(), 6);
}

#[tokio::test]
async fn compound_on_pool_grows_expectation() {
    let config = RaffleConfig::with_audience(1_000.0, vec![PrizeSpec::new(10.0, 50.0)]);
    let raffle = Raffle::new(config, pool()).unwrap();
    let options = CompoundOptions { ticket_cost: 10, max_tickets: Some(100), ..CompoundOptions::default() };

    let one = raffle.compound(5, 1, options).unwrap().await.unwrap();
    let three = raffle.compound(5, 3, options).unwrap().await.unwrap();
    assert_abs_diff_eq!(one.mean(), 2.5, epsilon = 1e-9);
    // reinvested prizes buy extra tickets, so later draws are worth more
    assert!(three.mean() > 3.0 * one.mean());
    assert_abs_diff_eq!(three.distribution().entries().map(|e| e.p).sum::<f64>(), 1.0, epsilon = 1e-9);
}

#[tokio::test]
async fn terminated_engine_rejects_entries() {
    let engine = pool();
    let raffle = Raffle::new(coin_flip(), Arc::clone(&engine)).unwrap();
    engine.terminate();
    assert_eq!(raffle.enter(1).unwrap().await, Err(Error::Terminated));
    assert_eq!(raffle.cached_entries(), 0);
}
