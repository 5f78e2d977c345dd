use floor_algorithms::floor_layout::exchange_climb::*;
use floor_challenges::floor_layout::*;
use floor_structs::core::WorkerState;
use rand::{rngs::SmallRng, SeedableRng};
use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

fn flat_challenge(floor: Snapshot) -> Challenge {
    let affinity = Affinity::from_config(&AffinityConfig::uniform(10, 0)).unwrap();
    Challenge::from_floor(&[3u8; 32], floor, affinity)
}

fn random_challenge(size: usize, seed: u64) -> Challenge {
    let floor = Snapshot::random(size, &mut SmallRng::seed_from_u64(seed)).unwrap();
    let affinity = Affinity::from_config(&AffinityConfig::default()).unwrap();
    Challenge::from_floor(&[seed as u8; 32], floor, affinity)
}

fn params(p_accept: f64, p_exchange: f64) -> Params {
    Params {
        p_accept,
        p_exchange,
        ..Params::default()
    }
}

#[test]
fn test_new_worker_starts_from_floor() {
    let challenge = random_challenge(6, 1);
    let worker = Worker::new(4, &challenge, Params::default());
    assert_eq!(worker.id(), 4);
    assert_eq!(worker.current(), &challenge.floor);
    assert_eq!(worker.best(), &challenge.floor);
    assert_eq!(worker.current_score(), challenge.score(&challenge.floor));
    assert_eq!(worker.best_score(), worker.current_score());
    assert_eq!(worker.state(), WorkerState::Running);
}

#[test]
fn test_best_score_never_decreases() {
    let challenge = random_challenge(8, 2);
    let mut worker = Worker::new(0, &challenge, params(0.2, 0.5));
    let exchange = Exchange::new();
    let member = exchange.join();
    let cancel = CancelToken::new();
    let mut best = worker.best_score();
    for _ in 0..3_000 {
        worker.step(&member, &cancel, None);
        assert!(worker.best_score() >= best);
        assert!(worker.best_score() >= worker.current_score());
        assert_eq!(challenge.score(worker.best()), worker.best_score());
        assert_eq!(challenge.score(worker.current()), worker.current_score());
        best = worker.best_score();
    }
    assert_eq!(worker.stats().iterations, 3_000);
    assert!(worker.stats().exchange_misses > 0);
    assert_eq!(worker.stats().exchanges, 0);
}

#[test]
fn test_swaps_keep_flavor_mix() {
    let challenge = random_challenge(7, 3);
    let mut worker = Worker::new(0, &challenge, params(0.5, 0.0));
    for _ in 0..2_000 {
        worker.propose_swap();
    }
    assert!(worker.current().is_exchangeable_with(&challenge.floor));
    assert!(worker.best().is_exchangeable_with(&challenge.floor));
    assert!(worker.stats().accepted > 0);
}

#[test]
fn test_strict_climb_never_accepts_worse() {
    let challenge = random_challenge(8, 4);
    let mut worker = Worker::new(0, &challenge, params(0.0, 0.0));
    let initial = worker.current_score();
    let mut current = initial;
    for _ in 0..2_000 {
        worker.propose_swap();
        assert!(worker.current_score() >= current);
        current = worker.current_score();
    }
    assert_eq!(worker.best_score(), worker.current_score());
    assert!(worker.best_score() >= initial);
}

#[test]
fn test_uniform_floor_stays_at_maximum() {
    let challenge = flat_challenge(Snapshot::uniform(3, Flavor::C).unwrap());
    let mut worker = Worker::new(0, &challenge, params(0.0, 0.0));
    assert_eq!(worker.best_score(), 120);
    assert_eq!(worker.best_score(), challenge.max_score());
    for _ in 0..500 {
        assert!(!worker.propose_swap());
    }
    assert_eq!(worker.best_score(), 120);
    assert_eq!(worker.current_score(), 120);
    assert_eq!(worker.stats().accepted, 0);
}

#[test]
fn test_consider_applies_policy() {
    let challenge = flat_challenge(Snapshot::from_text_rows(&["AB", "BA"]).unwrap());
    let mut worker = Worker::new(0, &challenge, params(0.0, 0.0));
    assert_eq!(worker.current_score(), 0);

    let better = Snapshot::from_text_rows(&["AA", "BB"]).unwrap();
    assert!(worker.consider(better.clone()));
    assert_eq!(worker.current_score(), 20);
    assert_eq!(worker.best(), &better);

    assert!(!worker.consider(Snapshot::from_text_rows(&["AB", "BA"]).unwrap()));
    assert!(!worker.consider(better.clone()));
    assert_eq!(worker.current(), &better);

    let mut lenient = Worker::new(1, &challenge, params(1.0, 0.0));
    assert!(lenient.consider(Snapshot::from_text_rows(&["AB", "BA"]).unwrap()));
    assert_eq!(lenient.stats().improvements, 0);
}

#[test]
fn test_mismatched_floors_are_rejected() {
    let first = flat_challenge(Snapshot::uniform(3, Flavor::A).unwrap());
    let second = flat_challenge(Snapshot::uniform(3, Flavor::B).unwrap());
    let mut a = Worker::new(0, &first, params(1.0, 0.0));
    let mut b = Worker::new(1, &second, params(1.0, 0.0));

    let exchange = Exchange::new();
    let (member_a, member_b) = (exchange.join(), exchange.join());
    let cancel = CancelToken::new();
    let cancel_b = cancel.clone();
    let handle = thread::spawn(move || {
        let outcome = b.try_exchange(&member_b, &cancel_b);
        (b, outcome)
    });
    assert_eq!(a.try_exchange(&member_a, &cancel), ExchangeOutcome::Mismatch);
    let (b, outcome) = handle.join().unwrap();
    assert_eq!(outcome, ExchangeOutcome::Mismatch);

    assert_eq!(a.current(), &first.floor);
    assert_eq!(b.current(), &second.floor);
    assert_eq!(a.best(), &first.floor);
    assert_eq!(a.stats().exchange_mismatches, 1);
    assert_eq!(b.stats().exchange_mismatches, 1);
}

#[test]
fn test_matching_floors_are_swapped() {
    let first = flat_challenge(Snapshot::from_text_rows(&["AB", "CD"]).unwrap());
    let second = flat_challenge(Snapshot::from_text_rows(&["DC", "BA"]).unwrap());
    let mut a = Worker::new(0, &first, params(1.0, 0.0));
    let mut b = Worker::new(1, &second, params(1.0, 0.0));

    let exchange = Exchange::new();
    let (member_a, member_b) = (exchange.join(), exchange.join());
    let cancel = CancelToken::new();
    let cancel_b = cancel.clone();
    let handle = thread::spawn(move || {
        let outcome = b.try_exchange(&member_b, &cancel_b);
        (b, outcome)
    });
    assert_eq!(a.try_exchange(&member_a, &cancel), ExchangeOutcome::Accepted);
    let (b, outcome) = handle.join().unwrap();
    assert_eq!(outcome, ExchangeOutcome::Accepted);
    assert_eq!(a.current(), &second.floor);
    assert_eq!(b.current(), &first.floor);
    assert_eq!(a.stats().exchanges, 1);
}

#[test]
fn test_cancel_while_blocked_keeps_state() {
    let challenge = random_challenge(6, 5);
    let mut worker = Worker::new(0, &challenge, params(0.1, 1.0));
    for _ in 0..200 {
        worker.propose_swap();
    }
    let (current, best) = (worker.current().clone(), worker.best().clone());
    let (current_score, best_score) = (worker.current_score(), worker.best_score());

    let exchange = Exchange::new();
    let member = exchange.join();
    let _idle = exchange.join();
    let cancel = CancelToken::new();
    let cancel_worker = cancel.clone();
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let outcome = worker.try_exchange(&member, &cancel_worker);
        let _ = done_tx.send(());
        (worker, outcome)
    });
    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    cancel.cancel();
    exchange.wake_all();
    done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));

    let (worker, outcome) = handle.join().unwrap();
    assert_eq!(outcome, ExchangeOutcome::Cancelled);
    assert_eq!(worker.current(), &current);
    assert_eq!(worker.best(), &best);
    assert_eq!(worker.current_score(), current_score);
    assert_eq!(worker.best_score(), best_score);
}

#[test]
fn test_run_stops_on_budget_and_cancel() {
    let challenge = random_challenge(5, 6);
    let exchange = Exchange::new();
    let member = exchange.join();

    let mut bounded = Worker::new(0, &challenge, Params::default());
    bounded.run(&member, &CancelToken::new(), None, Some(500));
    assert_eq!(bounded.stats().iterations, 500);
    assert_eq!(bounded.state(), WorkerState::Stopped);

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut cancelled = Worker::new(1, &challenge, Params::default());
    cancelled.run(&member, &cancel, None, None);
    assert_eq!(cancelled.stats().iterations, 0);
    assert_eq!(cancelled.state(), WorkerState::Stopped);
    assert_eq!(cancelled.current(), &challenge.floor);

    let report = bounded.report();
    assert_eq!(report.worker_id, 0);
    assert_eq!(report.state, WorkerState::Stopped);
    assert_eq!(report.best_score, bounded.best_score());
    assert_eq!(report.last_layout, bounded.current().text_rows());
    assert_eq!(report.stats.iterations, 500);
}

#[test]
fn test_render_is_rate_limited() {
    let challenge = random_challenge(4, 7);
    let exchange = Exchange::new();
    let member = exchange.join();
    let cancel = CancelToken::new();

    let (tx, rx) = mpsc::channel::<Frame>();
    let sink: &dyn RenderSink = &tx;
    let eager_params = Params {
        render_interval_ms: 0,
        ..params(0.05, 0.0)
    };
    let mut eager = Worker::new(0, &challenge, eager_params);
    for _ in 0..10 {
        eager.step(&member, &cancel, Some(sink));
    }
    let frames = rx.try_iter().collect::<Vec<_>>();
    assert_eq!(frames.len(), 10);
    let last = frames.last().unwrap();
    assert_eq!(last.worker_id, 0);
    assert_eq!(last.score, eager.current_score());
    assert_eq!(&last.snapshot, eager.current());

    let lazy_params = Params {
        render_interval_ms: 60_000,
        ..params(0.05, 0.0)
    };
    let mut lazy = Worker::new(1, &challenge, lazy_params);
    for _ in 0..10 {
        lazy.step(&member, &cancel, Some(sink));
    }
    assert_eq!(rx.try_iter().count(), 1);
}
