//! Concurrent puzzle evaluation.
//!
//! Phase one plays every task in its own tokio task, collecting outcomes in
//! completion order. Phase two starts once every outcome is final and sends
//! one feedback submission per task that obtained an episode.

use crate::attempt::{AttemptContext, AttemptState, play};
use crate::fallback::{FallbackPolicy, task_rng};
use crate::gate::AdmissionGate;
use crate::puzzle::PuzzleTask;
use chrono::Utc;
use rookery_config::PuzzleConfig;
use rookery_core::decision::{DecisionClient, Feedback, FeedbackValue};
use rookery_core::episode::EpisodeId;
use rookery_core::event::{DomainEvent, EventBus};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Final result of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub task_id: String,
    pub solved: bool,
    /// `None` when no decision ever succeeded
    pub episode: Option<EpisodeId>,
    pub state: AttemptState,
    pub agent_moves: u32,
    pub fallbacks: u32,
}

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// In completion order
    pub outcomes: Vec<EpisodeOutcome>,
    pub solved: usize,
    pub feedback_sent: usize,
    pub feedback_failed: usize,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Fraction of tasks solved; zero for an empty run.
    pub fn solve_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.solved as f64 / self.outcomes.len() as f64
        }
    }
}

/// Live counters, readable while a run is in progress.
#[derive(Debug, Default)]
pub struct RunProgress {
    completed: AtomicUsize,
    solved: AtomicUsize,
}

impl RunProgress {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn solved(&self) -> usize {
        self.solved.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.solved.store(0, Ordering::Relaxed);
    }

    fn record(&self, solved: bool) -> (usize, usize) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let solved = if solved {
            self.solved.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.solved.load(Ordering::Relaxed)
        };
        (completed, solved)
    }
}

/// Runner settings, usually built from `[puzzles]` config.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub function_name: String,
    pub strategy: String,
    pub metric_name: String,
    pub max_concurrency: usize,
    pub fallback: FallbackPolicy,
    pub seed: Option<u64>,
}

impl RunnerSettings {
    pub fn from_config(config: &PuzzleConfig) -> Self {
        Self {
            function_name: config.function_name.clone(),
            strategy: config.strategy.clone(),
            metric_name: config.metric_name.clone(),
            max_concurrency: config.max_concurrency,
            fallback: config.fallback.into(),
            seed: config.seed,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from_config(&PuzzleConfig::default())
    }
}

/// Drives many puzzle attempts against one decision client.
pub struct EpisodeRunner {
    context: Arc<AttemptContext>,
    metric_name: String,
    seed: Option<u64>,
    progress: Arc<RunProgress>,
    event_bus: Arc<EventBus>,
}

impl EpisodeRunner {
    pub fn new(
        client: Arc<dyn DecisionClient>,
        settings: RunnerSettings,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let context = AttemptContext {
            client,
            gate: AdmissionGate::new(settings.max_concurrency),
            function_name: settings.function_name,
            strategy: settings.strategy,
            policy: settings.fallback,
        };
        Self {
            context: Arc::new(context),
            metric_name: settings.metric_name,
            seed: settings.seed,
            progress: Arc::new(RunProgress::default()),
            event_bus,
        }
    }

    /// Counters for the current run, reset when a new run starts.
    pub fn progress(&self) -> Arc<RunProgress> {
        self.progress.clone()
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.context.gate
    }

    /// Play every task, then report feedback. Never fails: every task ends
    /// with an outcome.
    pub async fn run(&self, tasks: Vec<PuzzleTask>) -> RunReport {
        let total = tasks.len();
        self.progress.reset();
        info!(
            total,
            strategy = %self.context.strategy,
            max_concurrency = self.context.gate.capacity(),
            "Starting puzzle run"
        );

        let mut report = RunReport {
            outcomes: self.play_all(tasks).await,
            ..RunReport::default()
        };
        report.solved = report.outcomes.iter().filter(|o| o.solved).count();

        let (sent, failed) = self.submit_feedback(&report.outcomes).await;
        report.feedback_sent = sent;
        report.feedback_failed = failed;

        info!(
            solved = report.solved,
            total,
            feedback_sent = sent,
            feedback_failed = failed,
            "Puzzle run finished"
        );
        report
    }

    async fn play_all(&self, tasks: Vec<PuzzleTask>) -> Vec<EpisodeOutcome> {
        let total = tasks.len();
        let mut join_set = JoinSet::new();
        let mut task_ids = std::collections::HashMap::new();

        for (index, task) in tasks.into_iter().enumerate() {
            let context = self.context.clone();
            let seed = self.seed;
            let task_id = task.id().to_string();
            let handle = join_set.spawn(async move {
                let mut rng = task_rng(seed, index);
                play(&task, &context, &mut rng).await
            });
            task_ids.insert(handle.id(), task_id);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    let task_id = task_ids.remove(&e.id()).unwrap_or_default();
                    warn!(task_id = %task_id, error = %e, "Puzzle task panicked");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: format!("puzzle {task_id}"),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    EpisodeOutcome {
                        task_id,
                        solved: false,
                        episode: None,
                        state: AttemptState::Failed,
                        agent_moves: 0,
                        fallbacks: 0,
                    }
                }
            };

            let (completed, solved_so_far) = self.progress.record(outcome.solved);
            debug!(
                task_id = %outcome.task_id,
                solved = outcome.solved,
                completed,
                total,
                "Puzzle finished"
            );
            self.event_bus.publish(DomainEvent::EpisodeFinished {
                task_id: outcome.task_id.clone(),
                solved: outcome.solved,
                episode_id: outcome.episode.as_ref().map(ToString::to_string),
                completed,
                solved_so_far,
                total,
                timestamp: Utc::now(),
            });
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Returns `(sent, failed)`. Outcomes without an episode are skipped.
    async fn submit_feedback(&self, outcomes: &[EpisodeOutcome]) -> (usize, usize) {
        let mut join_set = JoinSet::new();

        for outcome in outcomes {
            let Some(episode) = outcome.episode.clone() else {
                debug!(task_id = %outcome.task_id, "No episode, skipping feedback");
                continue;
            };
            let feedback = Feedback {
                episode,
                metric_name: self.metric_name.clone(),
                value: FeedbackValue::Boolean(outcome.solved),
            };
            let context = self.context.clone();
            join_set.spawn(async move {
                let Some(_permit) = context.gate.admit().await else {
                    return (feedback, Err("admission gate closed".to_string()));
                };
                let result = context.client.submit_feedback(feedback.clone()).await;
                (feedback, result.map_err(|e| e.to_string()))
            });
        }

        let (mut sent, mut failed) = (0, 0);
        while let Some(joined) = join_set.join_next().await {
            let (episode_id, metric_name, success) = match joined {
                Ok((feedback, Ok(()))) => {
                    sent += 1;
                    (feedback.episode.to_string(), feedback.metric_name, true)
                }
                Ok((feedback, Err(e))) => {
                    failed += 1;
                    warn!(episode_id = %feedback.episode, error = %e, "Feedback submission failed");
                    (feedback.episode.to_string(), feedback.metric_name, false)
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "Feedback task panicked");
                    continue;
                }
            };
            self.event_bus.publish(DomainEvent::FeedbackSubmitted {
                episode_id,
                metric_name,
                success,
                timestamp: Utc::now(),
            });
        }
        (sent, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MATE_FEN, MATE_MOVES, MockClient, TWO_MOVE_FEN, TWO_MOVE_MOVES};
    use std::collections::HashSet;
    use std::time::Duration;

    fn tasks(n: usize) -> Vec<PuzzleTask> {
        (0..n)
            .map(|i| {
                let (fen, moves) = if i % 2 == 0 {
                    (MATE_FEN, MATE_MOVES)
                } else {
                    (TWO_MOVE_FEN, TWO_MOVE_MOVES)
                };
                PuzzleTask::new(format!("t{i}"), fen, moves).unwrap()
            })
            .collect()
    }

    fn settings(max_concurrency: usize, fallback: FallbackPolicy) -> RunnerSettings {
        RunnerSettings {
            max_concurrency,
            fallback,
            seed: Some(11),
            ..RunnerSettings::default()
        }
    }

    fn runner(client: Arc<MockClient>, settings: RunnerSettings) -> EpisodeRunner {
        EpisodeRunner::new(client, settings, Arc::new(EventBus::default()))
    }

    fn by_task(report: &RunReport) -> Vec<(String, bool)> {
        let mut pairs: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| (o.task_id.clone(), o.solved))
            .collect();
        pairs.sort();
        pairs
    }

    #[tokio::test]
    async fn oracle_client_solves_everything() {
        let tasks = tasks(6);
        let client = Arc::new(MockClient::oracle(&tasks));
        let report = runner(client, settings(3, FallbackPolicy::Forfeit)).run(tasks).await;

        assert_eq!(report.total(), 6);
        assert_eq!(report.solved, 6);
        assert!(report.outcomes.iter().all(|o| o.state == AttemptState::Solved));
        assert_eq!(report.solve_rate(), 1.0);
    }

    #[tokio::test]
    async fn outcomes_are_deterministic_for_deterministic_client() {
        let mut runs = Vec::new();
        for _ in 0..3 {
            let client = Arc::new(MockClient::fixed("e7e5").with_delay(Duration::from_millis(1)));
            let report = runner(client, settings(4, FallbackPolicy::RandomLegal))
                .run(tasks(8))
                .await;
            runs.push(by_task(&report));
        }
        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[1], runs[2]);
    }

    #[tokio::test]
    async fn wrong_first_move_fails_with_episode() {
        let client = Arc::new(MockClient::fixed("h2h3"));
        let task = PuzzleTask::new("wrong", MATE_FEN, MATE_MOVES).unwrap();
        let report = runner(client, settings(2, FallbackPolicy::RandomLegal))
            .run(vec![task])
            .await;

        let outcome = &report.outcomes[0];
        assert!(!outcome.solved);
        assert!(outcome.episode.is_some());
    }

    #[tokio::test]
    async fn transport_failures_still_finish_every_task() {
        for policy in [FallbackPolicy::RandomLegal, FallbackPolicy::Forfeit] {
            let client = Arc::new(MockClient::failing());
            let report = runner(client.clone(), settings(3, policy)).run(tasks(10)).await;

            assert_eq!(report.total(), 10);
            assert!(report.outcomes.iter().all(|o| o.state.is_final()));
            assert!(report.outcomes.iter().all(|o| o.episode.is_none()));
            // No episode, no feedback
            assert!(client.feedback().is_empty());
            assert_eq!(report.feedback_sent, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gate_bounds_in_flight_decisions() {
        let tasks = tasks(24);
        let client = Arc::new(MockClient::oracle(&tasks).with_delay(Duration::from_millis(15)));
        let runner = runner(client.clone(), settings(3, FallbackPolicy::Forfeit));
        let report = runner.run(tasks).await;

        assert_eq!(report.solved, 24);
        assert!(client.max_in_flight() <= 3, "saw {}", client.max_in_flight());
        assert!(client.max_in_flight() >= 2);
        assert_eq!(runner.gate().available(), 3);
    }

    #[tokio::test]
    async fn feedback_once_per_episode() {
        let tasks = tasks(5);
        let client = Arc::new(MockClient::oracle(&tasks));
        let report = runner(client.clone(), settings(2, FallbackPolicy::Forfeit)).run(tasks).await;

        let feedback = client.feedback();
        assert_eq!(feedback.len(), 5);
        assert_eq!(report.feedback_sent, 5);

        let episodes: HashSet<_> = feedback.iter().map(|f| f.episode.clone()).collect();
        assert_eq!(episodes.len(), 5);
        assert!(feedback.iter().all(|f| f.metric_name == "solved"));
        assert!(feedback.iter().all(|f| f.value == FeedbackValue::Boolean(true)));

        let reported: HashSet<_> = report.outcomes.iter().filter_map(|o| o.episode.clone()).collect();
        assert_eq!(episodes, reported);
    }

    #[tokio::test]
    async fn feedback_carries_failure_value() {
        let client = Arc::new(MockClient::fixed("h2h3"));
        let task = PuzzleTask::new("wrong", MATE_FEN, MATE_MOVES).unwrap();
        runner(client.clone(), settings(1, FallbackPolicy::Forfeit)).run(vec![task]).await;

        let feedback = client.feedback();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].value, FeedbackValue::Boolean(false));
    }

    #[tokio::test]
    async fn feedback_failures_are_counted_not_raised() {
        let tasks = tasks(4);
        let client = Arc::new(MockClient::oracle(&tasks).with_failing_feedback());
        let report = runner(client.clone(), settings(2, FallbackPolicy::Forfeit)).run(tasks).await;

        assert_eq!(report.solved, 4);
        assert_eq!(report.feedback_sent, 0);
        assert_eq!(report.feedback_failed, 4);
        // Attempted exactly once each
        assert_eq!(client.feedback().len(), 4);
    }

    #[tokio::test]
    async fn progress_and_events_track_completion() {
        let tasks = tasks(4);
        let client = Arc::new(MockClient::oracle(&tasks));
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let runner = EpisodeRunner::new(client, settings(2, FallbackPolicy::Forfeit), bus);

        runner.run(tasks).await;
        assert_eq!(runner.progress().completed(), 4);
        assert_eq!(runner.progress().solved(), 4);

        let mut completed_seen = Vec::new();
        let mut feedback_events = 0;
        while let Ok(event) = rx.try_recv() {
            match event.as_ref() {
                DomainEvent::EpisodeFinished { completed, total, .. } => {
                    assert_eq!(*total, 4);
                    completed_seen.push(*completed);
                }
                DomainEvent::FeedbackSubmitted { success, .. } => {
                    assert!(*success);
                    feedback_events += 1;
                }
                _ => {}
            }
        }
        assert_eq!(completed_seen, [1, 2, 3, 4]);
        assert_eq!(feedback_events, 4);
    }

    #[tokio::test]
    async fn reused_runner_counts_each_run_from_zero() {
        let first = tasks(3);
        let client = Arc::new(MockClient::oracle(&first));
        let bus = Arc::new(EventBus::new(64));
        let runner = EpisodeRunner::new(client, settings(2, FallbackPolicy::Forfeit), bus.clone());

        runner.run(first).await;
        let mut rx = bus.subscribe();
        runner.run(tasks(3)).await;

        assert_eq!(runner.progress().completed(), 3);
        assert_eq!(runner.progress().solved(), 3);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::EpisodeFinished {
                completed,
                solved_so_far,
                total,
                ..
            } = event.as_ref()
            {
                assert!(completed <= total);
                assert!(solved_so_far <= completed);
                seen.push(*completed);
            }
        }
        assert_eq!(seen, [1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_run_reports_nothing() {
        let client = Arc::new(MockClient::fixed("e2e4"));
        let report = runner(client.clone(), RunnerSettings::default()).run(Vec::new()).await;
        assert_eq!(report.total(), 0);
        assert_eq!(report.solve_rate(), 0.0);
        assert_eq!(client.decide_calls(), 0);
    }

    #[test]
    fn settings_follow_config() {
        let config = PuzzleConfig {
            strategy: "best_of_n".into(),
            max_concurrency: 7,
            seed: Some(3),
            ..PuzzleConfig::default()
        };
        let settings = RunnerSettings::from_config(&config);
        assert_eq!(settings.strategy, "best_of_n");
        assert_eq!(settings.max_concurrency, 7);
        assert_eq!(settings.fallback, FallbackPolicy::RandomLegal);
        assert_eq!(settings.seed, Some(3));
    }
}
