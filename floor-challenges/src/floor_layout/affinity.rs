use super::Flavor;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SELF_AFFINITY: i32 = 10;

fn default_self_affinity() -> i32 {
    DEFAULT_SELF_AFFINITY
}

/// How much `machine` benefits from having `neighbor` next to it.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct AffinityEntry {
    pub machine: Flavor,
    pub neighbor: Flavor,
    pub score: i32,
}

/// Affinity table as it appears in settings. Same-flavor pairs use
/// `self_affinity`; cross-flavor pairs missing from `pairs` score 0.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AffinityConfig {
    #[serde(default = "default_self_affinity")]
    pub self_affinity: i32,
    pub pairs: Vec<AffinityEntry>,
}

impl AffinityConfig {
    /// Every cross-flavor pair scores `cross`.
    pub fn uniform(self_affinity: i32, cross: i32) -> Self {
        let pairs = Flavor::ALL
            .iter()
            .flat_map(|&machine| {
                Flavor::ALL
                    .iter()
                    .filter(move |&&neighbor| neighbor != machine)
                    .map(move |&neighbor| AffinityEntry {
                        machine,
                        neighbor,
                        score: cross,
                    })
            })
            .collect();
        Self {
            self_affinity,
            pairs,
        }
    }
}

impl Default for AffinityConfig {
    fn default() -> Self {
        use Flavor::*;
        let table = [
            (A, B, 20),
            (A, C, 5),
            (A, D, 11),
            (B, A, 20),
            (B, C, 50),
            (B, D, 21),
            (C, A, 25),
            (C, B, 50),
            (C, D, -2),
            (D, A, 1),
            (D, B, 8),
            (D, C, -1),
        ];
        Self {
            self_affinity: DEFAULT_SELF_AFFINITY,
            pairs: table
                .iter()
                .map(|&(machine, neighbor, score)| AffinityEntry {
                    machine,
                    neighbor,
                    score,
                })
                .collect(),
        }
    }
}

/// Dense, validated form of an `AffinityConfig`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Affinity {
    matrix: [[i32; Flavor::COUNT]; Flavor::COUNT],
}

impl Affinity {
    pub fn from_config(config: &AffinityConfig) -> Result<Self> {
        if config.pairs.is_empty() {
            return Err(anyhow!("Affinity table must list at least one pair"));
        }
        let mut matrix = [[0; Flavor::COUNT]; Flavor::COUNT];
        let mut seen = [[false; Flavor::COUNT]; Flavor::COUNT];
        for entry in config.pairs.iter() {
            if entry.machine == entry.neighbor {
                return Err(anyhow!(
                    "Affinity pair {}->{} is a self pair, use self_affinity instead",
                    entry.machine,
                    entry.neighbor
                ));
            }
            let (m, n) = (entry.machine.index(), entry.neighbor.index());
            if seen[m][n] {
                return Err(anyhow!(
                    "Affinity pair {}->{} is listed more than once",
                    entry.machine,
                    entry.neighbor
                ));
            }
            seen[m][n] = true;
            matrix[m][n] = entry.score;
        }
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = config.self_affinity;
        }
        Ok(Self { matrix })
    }

    /// Directional: `affinity(x, y)` need not equal `affinity(y, x)`.
    pub fn affinity(&self, machine: Flavor, neighbor: Flavor) -> i32 {
        self.matrix[machine.index()][neighbor.index()]
    }

    pub fn max_entry(&self) -> i32 {
        self.matrix
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

impl TryFrom<&AffinityConfig> for Affinity {
    type Error = anyhow::Error;

    fn try_from(config: &AffinityConfig) -> Result<Self> {
        Affinity::from_config(config)
    }
}
