use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Params {
    /// Chance of keeping a candidate that does not beat the current score
    pub p_accept: f64,

    /// Chance per iteration of offering the current floor to another worker
    pub p_exchange: f64,

    /// Minimum wall-clock gap between two frames pushed to the render sink
    pub render_interval_ms: u64,

    pub num_workers: usize,

    /// Per-worker iteration budget for bounded runs
    pub max_iterations: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            p_accept: 0.05,
            p_exchange: 0.10,
            render_interval_ms: 250,
            num_workers: 10,
            max_iterations: 100_000,
        }
    }
}

fn get_f64(m: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match m.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("Hyperparameter '{}' must be a number (got {})", key, v)),
    }
}

fn get_u64(m: &Map<String, Value>, key: &str) -> Result<Option<u64>> {
    match m.get(key) {
        None => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            anyhow!(
                "Hyperparameter '{}' must be a non-negative integer (got {})",
                key,
                v
            )
        }),
    }
}

impl Params {
    pub fn initialize(h: &Option<Map<String, Value>>) -> Result<Self> {
        let mut p = Self::default();
        if let Some(m) = h {
            if let Some(v) = get_f64(m, "p_accept")? {
                p.p_accept = v;
            }
            if let Some(v) = get_f64(m, "p_exchange")? {
                p.p_exchange = v;
            }
            if let Some(v) = get_u64(m, "render_interval_ms")? {
                p.render_interval_ms = v;
            }
            if let Some(v) = get_u64(m, "num_workers")? {
                p.num_workers = v as usize;
            }
            if let Some(v) = get_u64(m, "max_iterations")? {
                p.max_iterations = v;
            }
        }
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("p_accept", self.p_accept), ("p_exchange", self.p_exchange)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1] (got {})", name, value));
            }
        }
        if self.num_workers == 0 {
            return Err(anyhow!("num_workers must be at least 1"));
        }
        Ok(())
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}
