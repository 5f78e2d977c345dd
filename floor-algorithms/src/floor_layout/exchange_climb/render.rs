use floor_challenges::floor_layout::Snapshot;
use std::sync::mpsc::Sender;

/// A worker's floor at one point in time, handed to a viewer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub worker_id: usize,
    pub score: i64,
    pub snapshot: Snapshot,
}

/// Receives frames from running workers. Implementations must return quickly
/// and never wait on the viewer.
pub trait RenderSink: Send + Sync {
    fn render(&self, frame: Frame);
}

impl RenderSink for Sender<Frame> {
    fn render(&self, frame: Frame) {
        // a viewer that went away only stops the pictures
        let _ = self.send(frame);
    }
}
