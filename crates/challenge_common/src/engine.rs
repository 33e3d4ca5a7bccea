//! Completion engine.
//!
//! The only writer of progress state. Each challenge instance can be
//! completed once; the check and the mutation happen under one lock that is
//! held until the save has finished, so two completions never overlap.

use crate::catalog::{ChallengeCatalog, ChallengeInstance};
use crate::celebration::Celebration;
use crate::config::ChallengeConfig;
use crate::error::{AlreadyCompleted, ChallengeError};
use crate::level::{level_for, reward_tiers, tier_crossed, LevelProgress, RewardTier};
use crate::notify::{completion_message, NotificationKind, Notifier};
use crate::seed::daily_instance;
use crate::store::{ProgressState, ProgressStore};
use crate::week::{week_overview, WeekDay};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a newly applied completion
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub key: String,
    pub reward: u64,
    pub new_points: u64,
    pub new_streak: u64,
    /// False when the save failed and the update lives in memory only
    pub persisted: bool,
    /// Reward tier reached by this completion, if any
    pub tier_unlocked: Option<RewardTier>,
}

/// Reward tier with its unlock state
#[derive(Debug, Clone, Serialize)]
pub struct TierStatus {
    pub tier: RewardTier,
    pub unlocked: bool,
}

/// Everything the daily challenge page shows, in one value
#[derive(Debug, Clone, Serialize)]
pub struct DailyBoard {
    pub date: NaiveDate,
    pub today: ChallengeInstance,
    pub completed: bool,
    pub total_points: u64,
    pub streak: u64,
    pub level: LevelProgress,
    pub week: Vec<WeekDay>,
    pub tiers: Vec<TierStatus>,
}

pub struct CompletionEngine {
    catalog: ChallengeCatalog,
    store: ProgressStore,
    state: Mutex<ProgressState>,
    celebration: Celebration,
    notifier: Arc<dyn Notifier>,
}

impl CompletionEngine {
    /// Build an engine, loading the persisted state once
    pub fn new(
        catalog: ChallengeCatalog,
        store: ProgressStore,
        notifier: Arc<dyn Notifier>,
        celebration_window: Duration,
    ) -> Self {
        let state = store.load();
        debug!(
            "Loaded progress: {} completed, {} points, streak {}",
            state.completed_count(),
            state.total_points,
            state.streak
        );
        Self {
            catalog,
            store,
            state: Mutex::new(state),
            celebration: Celebration::new(celebration_window),
            notifier,
        }
    }

    /// Engine over the default catalog and the on-disk store from `config`
    pub fn from_config(config: &ChallengeConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            ChallengeCatalog::default(),
            ProgressStore::on_disk(&config.data_dir, &config.key_prefix),
            notifier,
            config.celebration_window(),
        )
    }

    pub fn catalog(&self) -> &ChallengeCatalog {
        &self.catalog
    }

    pub fn celebration(&self) -> &Celebration {
        &self.celebration
    }

    /// The instance assigned to `date`
    pub fn daily(&self, date: NaiveDate) -> ChallengeInstance {
        daily_instance(&self.catalog, date)
    }

    /// Apply a completion once.
    ///
    /// A second call for the same instance returns [`AlreadyCompleted`] and
    /// changes nothing. A failed save is logged and the in-memory update is
    /// kept for the rest of the session.
    pub async fn complete(
        &self,
        instance: &ChallengeInstance,
    ) -> Result<CompletionOutcome, AlreadyCompleted> {
        let key = instance.key();
        let mut state = self.state.lock().await;

        if state.is_completed(&key) {
            debug!("Ignoring repeat completion of {}", key);
            return Err(AlreadyCompleted { key });
        }

        let reward = instance.reward();
        let mut next = state.clone();
        next.completed.insert(key.clone());
        next.total_points = next.total_points.saturating_add(reward);
        next.streak = next.streak.saturating_add(1);

        let persisted = match self.save_blocking(next.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Progress not saved, keeping it for this session only: {}", e);
                false
            }
        };

        let tier_unlocked = tier_crossed(state.total_points, next.total_points);
        *state = next;
        let outcome = CompletionOutcome {
            key,
            reward,
            new_points: state.total_points,
            new_streak: state.streak,
            persisted,
            tier_unlocked,
        };
        drop(state);

        info!(
            "Completed {} (+{}): {} points, streak {}",
            outcome.key, reward, outcome.new_points, outcome.new_streak
        );

        self.celebration.trigger();
        self.notifier.notify(
            &completion_message(reward, outcome.new_streak),
            NotificationKind::Success,
        );
        if let Some(tier) = &outcome.tier_unlocked {
            self.notifier.notify(
                &format!("{} Reward unlocked: {}", tier.badge, tier.name),
                NotificationKind::Info,
            );
        }

        Ok(outcome)
    }

    /// Store writes fsync, so they run off the async worker threads
    async fn save_blocking(&self, state: ProgressState) -> Result<(), ChallengeError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&state))
            .await
            .map_err(join_failed)?
    }

    /// Complete the challenge assigned to `date`
    pub async fn complete_daily(
        &self,
        date: NaiveDate,
    ) -> Result<CompletionOutcome, AlreadyCompleted> {
        let instance = self.daily(date);
        self.complete(&instance).await
    }

    pub async fn is_completed(&self, instance: &ChallengeInstance) -> bool {
        self.state.lock().await.is_completed(&instance.key())
    }

    /// Snapshot of the current in-memory state
    pub async fn state(&self) -> ProgressState {
        self.state.lock().await.clone()
    }

    pub async fn level(&self) -> LevelProgress {
        level_for(self.state.lock().await.total_points)
    }

    /// Build the daily board for `date`
    pub async fn board(&self, date: NaiveDate) -> DailyBoard {
        let state = self.state().await;
        let today = self.daily(date);
        let level = level_for(state.total_points);
        let tiers = reward_tiers()
            .into_iter()
            .map(|tier| TierStatus {
                unlocked: tier.is_unlocked(level.level),
                tier,
            })
            .collect();

        DailyBoard {
            date,
            completed: state.is_completed(&today.key()),
            today,
            total_points: state.total_points,
            streak: state.streak,
            level,
            week: week_overview(&self.catalog, date, &state),
            tiers,
        }
    }

    /// Re-read persisted state, e.g. after an external clear
    pub async fn reload(&self) {
        let mut state = self.state.lock().await;
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(loaded) => *state = loaded,
            Err(e) => warn!("Progress reload task failed: {}", e),
        }
    }

    /// Clear all persisted progress and zero the in-memory state
    pub async fn reset(&self) -> Result<(), ChallengeError> {
        let mut state = self.state.lock().await;
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(join_failed)??;
        *state = ProgressState::default();
        self.celebration.cancel();
        info!("Progress reset");
        Ok(())
    }
}

fn join_failed(e: tokio::task::JoinError) -> ChallengeError {
    ChallengeError::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Challenge;
    use crate::store::MemoryStore;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: StdMutex<Vec<(String, NotificationKind)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, kind: NotificationKind) {
            self.messages.lock().unwrap().push((message.to_string(), kind));
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine_with(
        backend: Arc<MemoryStore>,
    ) -> (CompletionEngine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = CompletionEngine::new(
            ChallengeCatalog::default(),
            ProgressStore::new(backend, "t-"),
            notifier.clone(),
            Duration::from_millis(3000),
        );
        (engine, notifier)
    }

    #[tokio::test]
    async fn test_complete_then_already_completed() {
        let (engine, notifier) = engine_with(Arc::new(MemoryStore::new()));
        let instance = engine.daily(date(2026, 10, 17));

        let outcome = engine.complete(&instance).await.unwrap();
        assert_eq!(outcome.reward, 35);
        assert_eq!(outcome.new_points, 35);
        assert_eq!(outcome.new_streak, 1);
        assert!(outcome.persisted);
        assert!(engine.celebration().is_active());

        let again = engine.complete(&instance).await;
        assert_eq!(
            again.unwrap_err(),
            AlreadyCompleted { key: "explore-locations-Sat Oct 17 2026".to_string() }
        );

        let state = engine.state().await;
        assert_eq!(state.total_points, 35);
        assert_eq!(state.streak, 1);
        assert_eq!(state.completed_count(), 1);

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "+35 points! Streak: 1 days");
        assert_eq!(messages[0].1, NotificationKind::Success);
    }

    #[tokio::test]
    async fn test_completion_is_persisted() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(backend.clone());
        engine.complete_daily(date(2026, 10, 14)).await.unwrap();
        drop(engine);

        let (restarted, _) = engine_with(backend);
        let state = restarted.state().await;
        assert_eq!(state.total_points, 50);
        assert!(restarted.is_completed(&restarted.daily(date(2026, 10, 14))).await);
        assert!(restarted.complete_daily(date(2026, 10, 14)).await.is_err());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_update() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, notifier) = engine_with(backend.clone());
        backend.set_fail_writes(true);

        let outcome = engine.complete_daily(date(2026, 10, 17)).await.unwrap();
        assert!(!outcome.persisted);
        assert_eq!(engine.state().await.total_points, 35);
        assert!(engine.complete_daily(date(2026, 10, 17)).await.is_err());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);

        // Nothing reached the backend
        backend.set_fail_writes(false);
        assert_eq!(ProgressStore::new(backend, "t-").load(), ProgressState::default());
    }

    #[tokio::test]
    async fn test_partial_save_failure_leaves_instance_completable_after_restart() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(backend.clone());
        engine.complete_daily(date(2026, 10, 14)).await.unwrap();

        // Completed list is written, the points record is not
        backend.set_fail_record(Some("challenge-points"));
        let outcome = engine.complete_daily(date(2026, 10, 17)).await.unwrap();
        assert!(!outcome.persisted);
        assert_eq!(outcome.new_points, 85);
        drop(engine);

        backend.set_fail_record(None);
        let (restarted, _) = engine_with(backend);
        let state = restarted.state().await;
        assert_eq!(state.total_points, 50);
        assert_eq!(state.streak, 1);
        assert!(!restarted.is_completed(&restarted.daily(date(2026, 10, 17))).await);

        let retried = restarted.complete_daily(date(2026, 10, 17)).await.unwrap();
        assert!(retried.persisted);
        assert_eq!(retried.new_points, 85);
        assert_eq!(retried.new_streak, 2);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_progress() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(backend.clone());
        engine.complete_daily(date(2026, 10, 17)).await.unwrap();

        backend.set_fail_record(Some("challenge-streak"));
        assert!(engine.reset().await.is_err());
        assert_eq!(engine.state().await.total_points, 35);

        backend.set_fail_record(None);
        engine.reload().await;
        assert_eq!(engine.state().await.total_points, 35);
        assert_eq!(engine.state().await.streak, 1);
    }

    #[tokio::test]
    async fn test_tier_unlock_notifies() {
        let backend = Arc::new(MemoryStore::new());
        let seeded = ProgressState {
            total_points: 1990,
            ..Default::default()
        };
        ProgressStore::new(backend.clone(), "t-").save(&seeded).unwrap();

        let (engine, notifier) = engine_with(backend);
        let outcome = engine.complete_daily(date(2026, 10, 17)).await.unwrap();
        assert_eq!(outcome.new_points, 2025);
        assert_eq!(outcome.tier_unlocked.unwrap().name, "Bronze Fan Badge");

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].1, NotificationKind::Info);
    }

    #[tokio::test]
    async fn test_concurrent_completions_apply_once() {
        let (engine, _) = engine_with(Arc::new(MemoryStore::new()));
        let engine = Arc::new(engine);
        let instance = engine.daily(date(2026, 10, 17));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            let instance = instance.clone();
            handles.push(tokio::spawn(async move { engine.complete(&instance).await.is_ok() }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(engine.state().await.streak, 1);
    }

    #[tokio::test]
    async fn test_board() {
        let (engine, _) = engine_with(Arc::new(MemoryStore::new()));
        let today = date(2026, 10, 17);
        engine.complete_daily(date(2026, 10, 14)).await.unwrap();

        let board = engine.board(today).await;
        assert_eq!(board.today.challenge.key, "explore-locations");
        assert!(!board.completed);
        assert_eq!(board.total_points, 50);
        assert_eq!(board.level.level, 1);
        assert_eq!(board.week.len(), 7);
        assert!(board.week[3].completed);
        assert!(board.week[6].instance.date == today);
        assert_eq!(board.tiers.len(), 4);
        assert!(board.tiers.iter().all(|t| !t.unlocked));
    }

    #[tokio::test]
    async fn test_reset() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(backend.clone());
        engine.complete_daily(date(2026, 10, 17)).await.unwrap();

        engine.reset().await.unwrap();
        assert_eq!(engine.state().await, ProgressState::default());
        assert!(!engine.celebration().is_active());
        assert_eq!(ProgressStore::new(backend, "t-").load(), ProgressState::default());

        // Same day can be completed again after a clear
        assert!(engine.complete_daily(date(2026, 10, 17)).await.is_ok());
    }

    #[tokio::test]
    async fn test_reload_sees_external_clear() {
        let backend = Arc::new(MemoryStore::new());
        let (engine, _) = engine_with(backend.clone());
        engine.complete_daily(date(2026, 10, 17)).await.unwrap();

        ProgressStore::new(backend, "t-").clear().unwrap();
        assert_eq!(engine.state().await.total_points, 35);
        engine.reload().await;
        assert_eq!(engine.state().await.total_points, 0);
    }

    #[tokio::test]
    async fn test_custom_catalog() {
        let catalog = ChallengeCatalog::new(vec![Challenge::new("solo", "Solo", "", 1, 7, "/")]).unwrap();
        let engine = CompletionEngine::new(
            catalog,
            ProgressStore::in_memory("t-"),
            Arc::new(RecordingNotifier::default()),
            Duration::from_millis(10),
        );
        engine.complete_daily(date(2026, 1, 1)).await.unwrap();
        engine.complete_daily(date(2026, 1, 2)).await.unwrap();
        assert_eq!(engine.level().await, level_for(14));
    }
}
