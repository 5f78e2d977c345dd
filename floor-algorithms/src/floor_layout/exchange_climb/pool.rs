use super::{
    exchange::{CancelToken, Exchange},
    params::Params,
    render::RenderSink,
    worker::Worker,
};
use anyhow::{anyhow, Result};
use floor_challenges::floor_layout::Challenge;
use floor_structs::core::WorkerState;
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::info;

/// A set of workers searching the same challenge on their own threads and
/// sharing one exchange.
pub struct WorkerPool {
    cancel: CancelToken,
    exchange: Arc<Exchange>,
    states: Vec<Arc<AtomicU8>>,
    handles: Vec<JoinHandle<Worker>>,
    started: Instant,
}

impl WorkerPool {
    /// Starts `params.num_workers` workers that run until cancelled.
    pub fn start(
        challenge: &Challenge,
        params: &Params,
        sink: Option<Arc<dyn RenderSink>>,
    ) -> Result<Self> {
        Self::spawn(challenge, params, sink, None)
    }

    /// Runs every worker for `params.max_iterations` and returns them stopped.
    pub fn run_bounded(
        challenge: &Challenge,
        params: &Params,
        sink: Option<Arc<dyn RenderSink>>,
    ) -> Result<Vec<Worker>> {
        Self::spawn(challenge, params, sink, Some(params.max_iterations))?.join()
    }

    fn spawn(
        challenge: &Challenge,
        params: &Params,
        sink: Option<Arc<dyn RenderSink>>,
        budget: Option<u64>,
    ) -> Result<Self> {
        params.validate()?;
        let mut pool = Self {
            cancel: CancelToken::new(),
            exchange: Exchange::new(),
            states: Vec::with_capacity(params.num_workers),
            handles: Vec::with_capacity(params.num_workers),
            started: Instant::now(),
        };
        // every member joins before any worker runs, so early exchanges can
        // already see their future partners
        let workers = (0..params.num_workers)
            .map(|id| (Worker::new(id, challenge, *params), pool.exchange.join()))
            .collect::<Vec<_>>();
        info!(
            workers = params.num_workers,
            size = challenge.difficulty.size,
            score = challenge.score(&challenge.floor),
            "starting worker pool"
        );
        for (mut worker, member) in workers {
            let cancel = pool.cancel.clone();
            let sink = sink.clone();
            pool.states.push(worker.state_handle());
            let handle = thread::Builder::new()
                .name(format!("floor-worker-{}", worker.id()))
                .spawn(move || {
                    worker.run(&member, &cancel, sink.as_deref(), budget);
                    drop(member);
                    worker
                })?;
            pool.handles.push(handle);
        }
        Ok(pool)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.states
            .iter()
            .map(|s| WorkerState::from_u8(s.load(Ordering::SeqCst)))
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|h| h.is_finished())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Signals every worker, including any parked at the exchange.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.exchange.wake_all();
    }

    /// Waits for every worker thread. All returned workers are `Stopped`.
    pub fn join(mut self) -> Result<Vec<Worker>> {
        let handles = std::mem::take(&mut self.handles);
        let mut workers = Vec::with_capacity(handles.len());
        for handle in handles {
            let worker = handle
                .join()
                .map_err(|_| anyhow!("Worker thread panicked"))?;
            workers.push(worker);
        }
        info!(
            workers = workers.len(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "worker pool stopped"
        );
        Ok(workers)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // a pool dropped without join still stops its threads
        if !self.handles.is_empty() {
            self.cancel();
        }
    }
}
