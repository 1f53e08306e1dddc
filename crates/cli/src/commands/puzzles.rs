//! `rookery puzzles`: Evaluate a strategy on a batch of chess puzzles.

use rookery_client::GatewayClient;
use rookery_config::AppConfig;
use rookery_core::event::{DomainEvent, EventBus};
use rookery_runner::{EpisodeRunner, RunnerSettings, load_puzzles};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

pub struct PuzzleArgs {
    pub file: PathBuf,
    pub limit: Option<usize>,
    pub strategy: Option<String>,
    pub concurrency: Option<usize>,
    pub seed: Option<u64>,
}

pub async fn run(args: PuzzleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(strategy) = args.strategy {
        config.puzzles.strategy = strategy;
    }
    if let Some(concurrency) = args.concurrency {
        config.puzzles.max_concurrency = concurrency;
    }
    if args.seed.is_some() {
        config.puzzles.seed = args.seed;
    }
    config.validate()?;

    let mut tasks = load_puzzles(&args.file)?;
    if let Some(limit) = args.limit {
        tasks.truncate(limit);
    }
    if tasks.is_empty() {
        return Err(format!("No valid puzzles in {}", args.file.display()).into());
    }

    let client = Arc::new(GatewayClient::from_config(&config.gateway)?);
    let event_bus = Arc::new(EventBus::default());
    let progress = tokio::spawn(log_progress(event_bus.subscribe()));

    let runner = EpisodeRunner::new(
        client,
        RunnerSettings::from_config(&config.puzzles),
        event_bus,
    );
    let report = runner.run(tasks).await;
    // Dropping the runner closes the bus and ends the progress task
    drop(runner);
    let _ = progress.await;

    println!();
    println!("   Strategy:  {}", config.puzzles.strategy);
    println!(
        "   Solved:    {}/{} ({:.1}%)",
        report.solved,
        report.total(),
        report.solve_rate() * 100.0
    );
    let fallbacks: u32 = report.outcomes.iter().map(|o| o.fallbacks).sum();
    println!("   Fallbacks: {fallbacks}");
    println!(
        "   Feedback:  {} sent, {} failed",
        report.feedback_sent, report.feedback_failed
    );

    Ok(())
}

/// Log run progress until the bus closes. Returns the number of finished
/// episodes seen.
async fn log_progress(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> usize {
    let mut seen = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let DomainEvent::EpisodeFinished {
                    completed,
                    solved_so_far,
                    total,
                    ..
                } = event.as_ref()
                {
                    seen += 1;
                    let step = (*total / 20).max(1);
                    if *completed % step == 0 || completed == total {
                        info!(completed, solved = solved_so_far, total, "Progress");
                    }
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    seen
}
