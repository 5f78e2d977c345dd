use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
mod exchange;
mod params;
mod pool;
mod render;
mod worker;
pub use exchange::{CancelToken, Exchange, ExchangeError, ExchangeMember, POLL_INTERVAL};
pub use params::Params;
pub use pool::WorkerPool;
pub use render::{Frame, RenderSink};
pub use worker::{ExchangeOutcome, Worker};
use floor_challenges::floor_layout::*;

/// Runs a bounded pool and saves the best floor found by any worker.
pub fn solve_challenge(
    challenge: &Challenge,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    hyperparameters: &Option<Map<String, Value>>,
) -> Result<()> {
    let params = Params::initialize(hyperparameters)?;
    let workers = WorkerPool::run_bounded(challenge, &params, None)?;
    match workers.iter().max_by_key(|w| w.best_score()) {
        Some(best) => save_solution(&Solution::from(best.best())),
        None => Err(anyhow!("No worker produced a floor")),
    }
}
