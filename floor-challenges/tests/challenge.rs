use floor_challenges::floor_layout::*;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

fn flat_affinity() -> Affinity {
    Affinity::from_config(&AffinityConfig::uniform(10, 0)).unwrap()
}

#[test]
fn test_uniform_floor_scores_maximum() {
    let affinity = flat_affinity();
    let floor = Snapshot::uniform(3, Flavor::B).unwrap();
    assert_eq!(calc_score(&floor, &affinity), 120);
    assert_eq!(max_score(3, &affinity), 120);
}

#[test]
fn test_single_change_lowers_uniform_score() {
    let affinity = flat_affinity();
    let floor = Snapshot::uniform(3, Flavor::A).unwrap();
    let best = calc_score(&floor, &affinity);
    for row in 0..3 {
        for col in 0..3 {
            for flavor in [Flavor::B, Flavor::C, Flavor::D] {
                let changed = floor.replace(flavor, row, col);
                assert!(calc_score(&changed, &affinity) < best);
            }
        }
    }
}

#[test]
fn test_score_counts_right_and_down_only() {
    let config = AffinityConfig {
        self_affinity: 0,
        pairs: vec![
            AffinityEntry {
                machine: Flavor::A,
                neighbor: Flavor::B,
                score: 1,
            },
            AffinityEntry {
                machine: Flavor::B,
                neighbor: Flavor::A,
                score: 100,
            },
        ],
    };
    let affinity = Affinity::from_config(&config).unwrap();
    // A is left of and above B, so only A->B terms count
    let floor = Snapshot::from_text_rows(&["AB", "BA"]).unwrap();
    assert_eq!(calc_score(&floor, &affinity), 1 + 1 + 100 + 100);
    let floor = Snapshot::from_text_rows(&["AB", "CC"]).unwrap();
    assert_eq!(calc_score(&floor, &affinity), 1);
}

#[test]
fn test_symmetric_table_matches_halved_four_neighbor_sum() {
    let affinity = Affinity::from_config(&AffinityConfig::uniform(7, 3)).unwrap();
    let mut rng = SmallRng::seed_from_u64(17);
    for _ in 0..20 {
        let size = rng.gen_range(MIN_SIZE..=9);
        let floor = Snapshot::random(size, &mut rng).unwrap();
        let mut total = 0i64;
        for row in 0..size {
            for col in 0..size {
                let m = floor.cell(row, col);
                let mut neighbors = Vec::new();
                if row > 0 {
                    neighbors.push((row - 1, col));
                }
                if row + 1 < size {
                    neighbors.push((row + 1, col));
                }
                if col > 0 {
                    neighbors.push((row, col - 1));
                }
                if col + 1 < size {
                    neighbors.push((row, col + 1));
                }
                for (r, c) in neighbors {
                    total += affinity.affinity(m, floor.cell(r, c)) as i64;
                }
            }
        }
        assert_eq!(calc_score(&floor, &affinity), total / 2);
    }
}

#[test]
fn test_score_is_deterministic() {
    let affinity = Affinity::from_config(&AffinityConfig::default()).unwrap();
    let mut rng = SmallRng::seed_from_u64(23);
    let floor = Snapshot::random(12, &mut rng).unwrap();
    let first = calc_score(&floor, &affinity);
    assert_eq!(first, calc_score(&floor, &affinity));
    assert_eq!(first, calc_score(&floor.clone(), &affinity));
}

#[test]
fn test_generate_instance_is_seeded() {
    let seed = [42u8; 32];
    let difficulty = Difficulty { size: 6 };
    let a = Challenge::generate_instance(&seed, &difficulty, &AffinityConfig::default()).unwrap();
    let b = Challenge::generate_instance(&seed, &difficulty, &AffinityConfig::default()).unwrap();
    assert_eq!(a.floor, b.floor);
    assert_eq!(a.floor.size(), 6);
    let c = Challenge::generate_instance(&[1u8; 32], &difficulty, &AffinityConfig::default())
        .unwrap();
    assert_ne!(a.floor, c.floor);
    assert!(
        Challenge::generate_instance(&seed, &Difficulty { size: 1 }, &AffinityConfig::default())
            .is_err()
    );
}

#[test]
fn test_verify_solution() {
    let seed = [9u8; 32];
    let challenge =
        Challenge::generate_instance(&seed, &Difficulty { size: 5 }, &AffinityConfig::default())
            .unwrap();
    let mut rng = SmallRng::seed_from_u64(1);

    let mut cells = challenge.floor.cells().to_vec();
    cells.shuffle(&mut rng);
    let solution = Solution {
        layout: cells.chunks(5).map(|row| row.to_vec()).collect(),
    };
    assert!(challenge.verify_solution(&solution).is_ok());
    let score = challenge.calc_score(&solution).unwrap();
    assert_eq!(
        score,
        challenge.score(&Snapshot::try_from(&solution).unwrap())
    );

    let original = Solution::from(&challenge.floor);
    let flipped = challenge.floor.cell(0, 0);
    let other = Flavor::ALL.iter().copied().find(|&f| f != flipped).unwrap();
    let tampered = Solution::from(&challenge.floor.replace(other, 0, 0));
    assert!(challenge.verify_solution(&original).is_ok());
    assert!(challenge.verify_solution(&tampered).is_err());

    let wrong_size = Solution::from(&Snapshot::uniform(4, Flavor::A).unwrap());
    assert!(challenge.verify_solution(&wrong_size).is_err());
    assert!(challenge.verify_solution(&Solution::new()).is_err());
}
