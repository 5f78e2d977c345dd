use floor_algorithms::floor_layout::exchange_climb::Frame;
use std::{
    collections::BTreeMap,
    io::Write,
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Draws the latest frame of every worker to stderr, at most once per
/// `interval`. Stops once every sender is gone.
pub fn spawn(frames: Receiver<Frame>, interval: Duration) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("floor-render".to_string())
        .spawn(move || {
            let mut latest = BTreeMap::<usize, Frame>::new();
            let mut last_draw = Instant::now();
            loop {
                match frames.recv_timeout(interval) {
                    Ok(frame) => {
                        latest.insert(frame.worker_id, frame);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if last_draw.elapsed() >= interval && !latest.is_empty() {
                    draw(&latest);
                    last_draw = Instant::now();
                }
            }
        })
}

fn draw(latest: &BTreeMap<usize, Frame>) {
    let mut out = String::new();
    let width = latest
        .values()
        .map(|f| {
            let label = format!("#{} {}", f.worker_id, f.score);
            f.snapshot.size().max(label.len())
        })
        .max()
        .unwrap_or(0);
    let grids = latest
        .values()
        .map(|f| (format!("#{} {}", f.worker_id, f.score), f.snapshot.text_rows()))
        .collect::<Vec<_>>();
    let height = grids.iter().map(|(_, rows)| rows.len()).max().unwrap_or(0);

    let labels = grids
        .iter()
        .map(|(label, _)| format!("{:<width$}", label, width = width))
        .collect::<Vec<_>>();
    out.push_str(labels.join("  ").trim_end());
    out.push('\n');
    for i in 0..height {
        let line = grids
            .iter()
            .map(|(_, rows)| {
                let row = rows.get(i).map(|r| r.as_str()).unwrap_or("");
                format!("{:<width$}", row, width = width)
            })
            .collect::<Vec<_>>();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", out);
}
