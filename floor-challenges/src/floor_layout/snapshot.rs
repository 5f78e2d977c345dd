use super::Flavor;
use anyhow::{anyhow, Result};
use rand::Rng;
use std::{fmt, sync::Arc};

pub const MIN_SIZE: usize = 2;
/// Largest side whose signature weights still fit in a `u64`.
pub const MAX_SIZE: usize = 255;

/// An immutable arrangement of machines on a square floor.
///
/// Cells are stored row-major behind an `Arc`, so clones share storage and
/// every edit builds a fresh grid. A holder of a snapshot never observes a
/// change made through another clone.
///
/// The `signature` is a mixed-radix count of each flavor: flavor `k` weighs
/// `(size² + 1)^k`. Since no count can exceed `size²`, two snapshots of the
/// same side share a signature exactly when they hold the same number of each
/// flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    size: usize,
    cells: Arc<[Flavor]>,
    signature: u64,
}

pub fn check_size(size: usize) -> Result<()> {
    if size < MIN_SIZE || size > MAX_SIZE {
        Err(anyhow!(
            "Floor size must be between {} and {} (got {})",
            MIN_SIZE,
            MAX_SIZE,
            size
        ))
    } else {
        Ok(())
    }
}

fn exchange_weights(size: usize) -> [u64; Flavor::COUNT] {
    let base = (size * size) as u64 + 1;
    let mut weights = [1u64; Flavor::COUNT];
    for k in 1..Flavor::COUNT {
        weights[k] = weights[k - 1] * base;
    }
    weights
}

impl Snapshot {
    fn from_cells(size: usize, cells: Vec<Flavor>) -> Self {
        let weights = exchange_weights(size);
        let signature = cells.iter().map(|f| weights[f.index()]).sum();
        Self {
            size,
            cells: cells.into(),
            signature,
        }
    }

    /// Draws every cell independently and uniformly.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self> {
        check_size(size)?;
        let cells = (0..size * size).map(|_| rng.gen::<Flavor>()).collect();
        Ok(Self::from_cells(size, cells))
    }

    pub fn uniform(size: usize, flavor: Flavor) -> Result<Self> {
        check_size(size)?;
        Ok(Self::from_cells(size, vec![flavor; size * size]))
    }

    pub fn from_rows(rows: &[Vec<Flavor>]) -> Result<Self> {
        let size = rows.len();
        check_size(size)?;
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(anyhow!(
                "Floor must be exactly {}x{} (row {} has {} cells)",
                size,
                size,
                i,
                row.len()
            ));
        }
        Ok(Self::from_cells(size, rows.concat()))
    }

    /// Parses one line per row, one flavor letter per cell.
    pub fn from_text_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .trim()
                    .chars()
                    .map(|c| {
                        Flavor::from_symbol(c).ok_or_else(|| anyhow!("Unknown flavor '{}'", c))
                    })
                    .collect::<Result<Vec<Flavor>>>()
            })
            .collect::<Result<Vec<Vec<Flavor>>>>()?;
        Self::from_rows(&rows)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Row-major view of every cell.
    pub fn cells(&self) -> &[Flavor] {
        &self.cells
    }

    /// Coordinates wrap modulo the side, so any pair is valid.
    pub fn cell(&self, row: usize, col: usize) -> Flavor {
        self.cells[(row % self.size) * self.size + col % self.size]
    }

    /// Returns a copy with a single cell changed. `self` is left untouched.
    pub fn replace(&self, flavor: Flavor, row: usize, col: usize) -> Self {
        let mut cells = self.cells.to_vec();
        cells[(row % self.size) * self.size + col % self.size] = flavor;
        Self::from_cells(self.size, cells)
    }

    /// Swaps two cells as two chained replacements: the second coordinate
    /// receives the first flavor, then the first coordinate receives the second.
    pub fn swap(&self, first: (usize, usize), second: (usize, usize)) -> Self {
        let first_flavor = self.cell(first.0, first.1);
        let second_flavor = self.cell(second.0, second.1);
        self.replace(first_flavor, second.0, second.1)
            .replace(second_flavor, first.0, first.1)
    }

    pub fn flavor_counts(&self) -> [usize; Flavor::COUNT] {
        let mut counts = [0; Flavor::COUNT];
        for flavor in self.cells.iter() {
            counts[flavor.index()] += 1;
        }
        counts
    }

    /// Two snapshots may be exchanged without changing the global mix of
    /// machines only if their signatures match.
    pub fn is_exchangeable_with(&self, other: &Snapshot) -> bool {
        self.size == other.size && self.signature == other.signature
    }

    pub fn rows(&self) -> Vec<Vec<Flavor>> {
        self.cells.chunks(self.size).map(|row| row.to_vec()).collect()
    }

    pub fn text_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.size)
            .map(|row| row.iter().map(|f| f.symbol()).collect())
            .collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.text_rows() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
