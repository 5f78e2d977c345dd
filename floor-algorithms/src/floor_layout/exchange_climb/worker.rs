use super::{
    exchange::{CancelToken, ExchangeError, ExchangeMember},
    params::Params,
    render::{Frame, RenderSink},
};
use floor_challenges::floor_layout::{calc_score, Affinity, Challenge, Snapshot};
use floor_structs::core::{WorkerReport, WorkerState, WorkerStats};
use floor_utils::derive_seed;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{debug, info};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// A partner's floor was taken as the new current floor.
    Accepted,
    /// A partner's floor arrived but lost the acceptance draw.
    Rejected,
    /// A partner's floor held a different mix of flavors and was dropped.
    Mismatch,
    Cancelled,
    NoPartner,
}

/// One hill-climbing search over its own floor.
///
/// Only the owning thread mutates a worker. Its lifecycle state is mirrored in
/// a shared atomic so a pool can watch it from outside.
pub struct Worker {
    id: usize,
    affinity: Affinity,
    params: Params,
    rng: SmallRng,
    current: Snapshot,
    current_score: i64,
    best: Snapshot,
    best_score: i64,
    state: Arc<AtomicU8>,
    stats: WorkerStats,
    last_render: Option<Instant>,
}

impl Worker {
    /// Starts from the challenge floor with a random stream derived from the
    /// challenge seed and `id`.
    pub fn new(id: usize, challenge: &Challenge, params: Params) -> Self {
        let current = challenge.floor.clone();
        let current_score = challenge.score(&current);
        Self {
            id,
            affinity: challenge.affinity,
            params,
            rng: SmallRng::from_seed(derive_seed(&challenge.seed, id as u64)),
            best: current.clone(),
            best_score: current_score,
            current,
            current_score,
            state: Arc::new(AtomicU8::new(WorkerState::Running.as_u8())),
            stats: WorkerStats::default(),
            last_render: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn current_score(&self) -> i64 {
        self.current_score
    }

    pub fn best(&self) -> &Snapshot {
        &self.best
    }

    pub fn best_score(&self) -> i64 {
        self.best_score
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn state_handle(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.state)
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Scores `candidate` from scratch and applies the acceptance policy.
    /// Returns whether it became the current floor.
    pub fn consider(&mut self, candidate: Snapshot) -> bool {
        let score = calc_score(&candidate, &self.affinity);
        let accepted = score > self.current_score || self.rng.gen_bool(self.params.p_accept);
        if !accepted {
            return false;
        }
        self.current = candidate;
        self.current_score = score;
        self.stats.accepted += 1;
        if score > self.best_score {
            debug!(worker = self.id, score, "new best");
            self.best = self.current.clone();
            self.best_score = score;
            self.stats.improvements += 1;
        }
        true
    }

    /// Swaps two random cells (possibly the same one) and considers the result.
    pub fn propose_swap(&mut self) -> bool {
        let size = self.current.size();
        let first = (self.rng.gen_range(0..size), self.rng.gen_range(0..size));
        let second = (self.rng.gen_range(0..size), self.rng.gen_range(0..size));
        let candidate = self.current.swap(first, second);
        self.consider(candidate)
    }

    /// Offers the current floor to whichever worker is waiting at the exchange.
    /// State only changes when a partner's floor with the same flavor mix wins
    /// the acceptance policy.
    pub fn try_exchange(
        &mut self,
        member: &ExchangeMember,
        cancel: &CancelToken,
    ) -> ExchangeOutcome {
        let offer = self.current.clone();
        match member.exchange(offer.clone(), cancel) {
            Ok(received) => {
                self.stats.exchanges += 1;
                if !received.is_exchangeable_with(&offer) {
                    self.stats.exchange_mismatches += 1;
                    debug!(
                        worker = self.id,
                        offered = offer.signature(),
                        received = received.signature(),
                        "dropping exchanged floor with a different flavor mix"
                    );
                    ExchangeOutcome::Mismatch
                } else if self.consider(received) {
                    debug!(worker = self.id, score = self.current_score, "took exchanged floor");
                    ExchangeOutcome::Accepted
                } else {
                    ExchangeOutcome::Rejected
                }
            }
            Err(ExchangeError::Cancelled) => ExchangeOutcome::Cancelled,
            Err(ExchangeError::NoPartner) => {
                self.stats.exchange_misses += 1;
                ExchangeOutcome::NoPartner
            }
        }
    }

    fn maybe_render(&mut self, sink: Option<&dyn RenderSink>) {
        let Some(sink) = sink else {
            return;
        };
        let now = Instant::now();
        let due = match self.last_render {
            Some(last) => now.duration_since(last) >= self.params.render_interval(),
            None => true,
        };
        if due {
            self.last_render = Some(now);
            sink.render(Frame {
                worker_id: self.id,
                score: self.current_score,
                snapshot: self.current.clone(),
            });
        }
    }

    /// One iteration of the search loop.
    pub fn step(
        &mut self,
        member: &ExchangeMember,
        cancel: &CancelToken,
        sink: Option<&dyn RenderSink>,
    ) {
        self.stats.iterations += 1;
        self.propose_swap();
        if self.rng.gen_bool(self.params.p_exchange) {
            self.try_exchange(member, cancel);
        }
        self.maybe_render(sink);
    }

    /// Runs until `cancel` fires or, when given, `budget` iterations are done.
    /// Ends in `Stopped` with current and best floors intact.
    pub fn run(
        &mut self,
        member: &ExchangeMember,
        cancel: &CancelToken,
        sink: Option<&dyn RenderSink>,
        budget: Option<u64>,
    ) {
        self.set_state(WorkerState::Running);
        info!(worker = self.id, score = self.current_score, "worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if budget.is_some_and(|b| self.stats.iterations >= b) {
                break;
            }
            self.step(member, cancel, sink);
        }
        self.set_state(WorkerState::Stopping);
        info!(
            worker = self.id,
            last = self.current_score,
            best = self.best_score,
            iterations = self.stats.iterations,
            "worker stopped"
        );
        self.set_state(WorkerState::Stopped);
    }

    pub fn report(&self) -> WorkerReport {
        WorkerReport {
            worker_id: self.id,
            state: self.state(),
            best_score: self.best_score,
            last_score: self.current_score,
            best_layout: self.best.text_rows(),
            last_layout: self.current.text_rows(),
            stats: self.stats.clone(),
        }
    }
}
