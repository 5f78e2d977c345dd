mod render;

use anyhow::{anyhow, Result};
use clap::{arg, ArgAction, Command};
use floor_algorithms::floor_layout::exchange_climb::{Params, RenderSink, Worker, WorkerPool};
use floor_challenges::floor_layout::{Challenge, Solution};
use floor_structs::{
    config::RunSettings,
    core::{RunReport, WorkerState},
};
use floor_utils::{compress_obj, decompress_obj, dejsonify, jsonify};
use std::{
    fs,
    io::{BufRead, Read},
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("floor-runtime")
        .about("Searches for or verifies floor layouts")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("search")
                .about("Runs parallel workers until stopped and reports their floors")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--nonce [NONCE] "Nonce value used in seed generation")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Overrides the num_workers hyperparameter")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--duration [DURATION] "Stop after this many milliseconds instead of waiting for a line on stdin")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--render [RENDER] "Draw every worker's floor to stderr while searching")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the report will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the report will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Verifies a floor layout")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(<SOLUTION> "Solution json string, path to json file, path to a compressed report, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--nonce [NONCE] "Nonce value used in seed generation")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("search", sub_m)) => search(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            *sub_m.get_one::<u64>("nonce").unwrap(),
            sub_m.get_one::<usize>("workers").copied(),
            sub_m.get_one::<u64>("duration").copied(),
            sub_m.get_flag("render"),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_flag("compress"),
        ),
        Some(("verify", sub_m)) => verify(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            sub_m.get_one::<String>("SOLUTION").unwrap().clone(),
            *sub_m.get_one::<u64>("nonce").unwrap(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

pub fn search(
    settings: String,
    nonce: u64,
    num_workers: Option<usize>,
    duration_ms: Option<u64>,
    render: bool,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let settings = load_settings(&settings)?;
    let challenge = settings.generate_challenge(nonce)?;
    let mut params = Params::initialize(&settings.hyperparameters)?;
    if let Some(n) = num_workers {
        params.num_workers = n;
        params.validate()?;
    }

    let (sink, renderer) = if render {
        let (tx, rx) = mpsc::channel();
        let renderer = render::spawn(rx, params.render_interval().max(Duration::from_millis(1)))?;
        (Some(Arc::new(tx) as Arc<dyn RenderSink>), Some(renderer))
    } else {
        (None, None)
    };

    let pool = WorkerPool::start(&challenge, &params, sink)?;
    match duration_ms {
        Some(ms) => info!("searching for {}ms, press enter to stop early", ms),
        None => info!("searching, press enter to stop"),
    }
    wait_for_stop(duration_ms.map(Duration::from_millis));

    pool.cancel();
    let elapsed = pool.elapsed();
    let workers = pool.join()?;
    // the renderer drains once the last worker drops its sender
    if let Some(renderer) = renderer {
        if renderer.join().is_err() {
            warn!("renderer thread panicked");
        }
    }

    let report = build_report(settings, nonce, &challenge, &workers, elapsed);
    for worker in report.workers.iter() {
        if worker.state != WorkerState::Stopped {
            warn!(worker = worker.worker_id, state = %worker.state, "worker did not stop");
        }
        info!(worker = worker.worker_id, "{} < {}", worker.last_score, worker.best_score);
    }
    if let Some(best) = report.best() {
        info!(
            worker = best.worker_id,
            best = best.best_score,
            max = report.max_score,
            "best floor found"
        );
    }

    if let Some(path) = output_file {
        if compress {
            fs::write(&path, compress_obj(&report)?)?;
        } else {
            fs::write(&path, jsonify(&report))?;
        }
        info!("report written to: {:?}", path);
    } else {
        println!("{}", jsonify(&report));
    }
    Ok(())
}

pub fn verify(settings: String, solution: String, nonce: u64) -> Result<()> {
    let settings = load_settings(&settings)?;
    let solution = load_solution(&solution)?;
    let challenge = settings.generate_challenge(nonce)?;

    challenge
        .verify_solution(&solution)
        .map_err(|e| anyhow!("Invalid solution: {}", e))?;
    let score = challenge.calc_score(&solution)?;
    println!(
        "Solution is valid (score {} of at most {})",
        score,
        challenge.max_score()
    );
    Ok(())
}

fn build_report(
    settings: RunSettings,
    nonce: u64,
    challenge: &Challenge,
    workers: &[Worker],
    elapsed: Duration,
) -> RunReport {
    RunReport {
        settings,
        nonce,
        initial_score: challenge.score(&challenge.floor),
        max_score: challenge.max_score(),
        elapsed_ms: Some(elapsed.as_millis() as u64),
        workers: workers.iter().map(Worker::report).collect(),
    }
}

/// Blocks until a line arrives on stdin or `duration` passes. A closed stdin
/// only ends the wait when no duration is given.
fn wait_for_stop(duration: Option<Duration>) {
    let (tx, rx) = mpsc::channel();
    let _ = thread::Builder::new()
        .name("floor-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line);
            let _ = tx.send(matches!(read, Ok(n) if n > 0));
        });

    match duration {
        None => {
            let _ = rx.recv();
        }
        Some(duration) => {
            let deadline = Instant::now() + duration;
            if let Ok(false) = rx.recv_timeout(duration) {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
            }
        }
    }
}

fn load_settings(settings: &str) -> Result<RunSettings> {
    let settings = if settings.ends_with(".json") {
        fs::read_to_string(settings)
            .map_err(|e| anyhow!("Failed to read settings file {}: {}", settings, e))?
    } else {
        settings.to_string()
    };

    dejsonify::<RunSettings>(&settings).map_err(|e| anyhow!("Failed to parse settings: {}", e))
}

fn load_solution(solution: &str) -> Result<Solution> {
    let solution = if solution == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow!("Failed to read solution from stdin: {}", e))?;
        buffer
    } else if solution.ends_with(".json") {
        fs::read_to_string(solution)
            .map_err(|e| anyhow!("Failed to read solution file {}: {}", solution, e))?
    } else if Path::new(solution).is_file() {
        // a report written by `search --output FILE --compress`
        let bytes = fs::read(solution)
            .map_err(|e| anyhow!("Failed to read report file {}: {}", solution, e))?;
        let report = decompress_obj::<RunReport>(&bytes)
            .map_err(|e| anyhow!("Failed to decompress report {}: {}", solution, e))?;
        return report.best_solution();
    } else {
        solution.to_string()
    };

    dejsonify::<Solution>(&solution).map_err(|e| anyhow!("Failed to parse solution: {}", e))
}
