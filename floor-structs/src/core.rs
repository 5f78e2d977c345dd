use crate::{config::RunSettings, serializable_struct_with_defaults};
use anyhow::{anyhow, Result};
use floor_challenges::floor_layout::{Snapshot, Solution};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Running,
    Stopping,
    Stopped,
}

impl WorkerState {
    pub fn as_u8(self) -> u8 {
        match self {
            WorkerState::Running => 0,
            WorkerState::Stopping => 1,
            WorkerState::Stopped => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Running,
            1 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Running => write!(f, "running"),
            WorkerState::Stopping => write!(f, "stopping"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

serializable_struct_with_defaults! {
    WorkerStats {
        iterations: u64,
        accepted: u64,
        improvements: u64,
        exchanges: u64,
        exchange_mismatches: u64,
        exchange_misses: u64,
    }
}

impl Default for WorkerStats {
    fn default() -> Self {
        Self {
            iterations: 0,
            accepted: 0,
            improvements: 0,
            exchanges: 0,
            exchange_mismatches: 0,
            exchange_misses: 0,
        }
    }
}

serializable_struct_with_defaults! {
    WorkerReport {
        worker_id: usize,
        state: WorkerState,
        best_score: i64,
        last_score: i64,
        best_layout: Vec<String>,
        last_layout: Vec<String>,
        stats: WorkerStats,
    }
}

serializable_struct_with_defaults! {
    RunReport {
        settings: RunSettings,
        nonce: u64,
        initial_score: i64,
        max_score: i64,
        elapsed_ms: Option<u64>,
        workers: Vec<WorkerReport>,
    }
}

impl RunReport {
    /// Highest best score across workers. Ties go to the lowest worker id.
    pub fn best(&self) -> Option<&WorkerReport> {
        self.workers
            .iter()
            .max_by(|a, b| {
                a.best_score
                    .cmp(&b.best_score)
                    .then(b.worker_id.cmp(&a.worker_id))
            })
    }

    /// The floor of `best()` as a solution that can be verified.
    pub fn best_solution(&self) -> Result<Solution> {
        let best = self
            .best()
            .ok_or_else(|| anyhow!("Report has no workers"))?;
        let snapshot = Snapshot::from_text_rows(&best.best_layout)?;
        Ok(Solution::from(&snapshot))
    }
}
