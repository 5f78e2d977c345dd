use super::{Affinity, Snapshot};

/// Scores a floor from scratch using right and down neighbors only.
///
/// Each adjacent pair is counted once, from the cell on its left or top. The
/// bottom-right machine contributes no term of its own.
pub fn calc_score(snapshot: &Snapshot, affinity: &Affinity) -> i64 {
    let size = snapshot.size();
    let cells = snapshot.cells();
    let mut score = 0i64;
    for row in 0..size {
        for col in 0..size {
            let machine = cells[row * size + col];
            if col + 1 < size {
                score += affinity.affinity(machine, cells[row * size + col + 1]) as i64;
            }
            if row + 1 < size {
                score += affinity.affinity(machine, cells[(row + 1) * size + col]) as i64;
            }
        }
    }
    score
}

/// Upper bound on `calc_score` for a floor of the given side.
pub fn max_score(size: usize, affinity: &Affinity) -> i64 {
    let pairs = 2 * size * size.saturating_sub(1);
    pairs as i64 * affinity.max_entry() as i64
}
