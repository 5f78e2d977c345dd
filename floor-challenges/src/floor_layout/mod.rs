mod affinity;
mod flavor;
mod metric;
mod snapshot;

pub use affinity::*;
pub use flavor::*;
pub use metric::*;
pub use snapshot::*;

use anyhow::{anyhow, Result};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Difficulty {
    pub size: usize,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self { size: 8 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub layout: Vec<Vec<Flavor>>,
}

impl Solution {
    pub fn new() -> Self {
        Self { layout: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Snapshot> for Solution {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            layout: snapshot.rows(),
        }
    }
}

impl TryFrom<&Solution> for Snapshot {
    type Error = anyhow::Error;

    fn try_from(solution: &Solution) -> Result<Self> {
        Snapshot::from_rows(&solution.layout)
    }
}

/// A seeded floor together with the affinities used to score it. Every worker
/// starts from `floor`, and any valid solution is a rearrangement of it.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub seed: [u8; 32],
    pub difficulty: Difficulty,
    pub affinity: Affinity,
    pub floor: Snapshot,
}

impl Challenge {
    pub fn generate_instance(
        seed: &[u8; 32],
        difficulty: &Difficulty,
        affinity: &AffinityConfig,
    ) -> Result<Self> {
        let affinity = Affinity::from_config(affinity)?;
        let mut rng = SmallRng::from_seed(*seed);
        let floor = Snapshot::random(difficulty.size, &mut rng)?;
        Ok(Self {
            seed: *seed,
            difficulty: *difficulty,
            affinity,
            floor,
        })
    }

    /// Builds a challenge around a known floor instead of a random one, for
    /// embedders that resume from a saved layout. The seed only drives the
    /// workers' random streams.
    pub fn from_floor(seed: &[u8; 32], floor: Snapshot, affinity: Affinity) -> Self {
        Self {
            seed: *seed,
            difficulty: Difficulty { size: floor.size() },
            affinity,
            floor,
        }
    }

    pub fn score(&self, snapshot: &Snapshot) -> i64 {
        calc_score(snapshot, &self.affinity)
    }

    pub fn max_score(&self) -> i64 {
        max_score(self.difficulty.size, &self.affinity)
    }

    pub fn calc_score(&self, solution: &Solution) -> Result<i64> {
        let snapshot = Snapshot::try_from(solution)?;
        Ok(self.score(&snapshot))
    }

    pub fn verify_solution(&self, solution: &Solution) -> Result<()> {
        let snapshot = Snapshot::try_from(solution)?;
        if snapshot.size() != self.difficulty.size {
            return Err(anyhow!(
                "Floor size must be exactly {}x{} (got {}x{})",
                self.difficulty.size,
                self.difficulty.size,
                snapshot.size(),
                snapshot.size()
            ));
        }
        if !snapshot.is_exchangeable_with(&self.floor) {
            return Err(anyhow!(
                "Flavor counts {:?} do not match the seeded floor {:?}",
                snapshot.flavor_counts(),
                self.floor.flavor_counts()
            ));
        }
        Ok(())
    }
}
