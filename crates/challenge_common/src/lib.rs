//! Challenge Common - daily challenge progression core.
//!
//! Deterministic daily challenge selection, weekly projection, persisted
//! progress (completed instances, points, streak) and level derivation.
//! Rendering, routing and catalog fetching live outside this crate.

pub mod catalog;
pub mod celebration;
pub mod config;
pub mod engine;
pub mod error;
pub mod level;
pub mod notify;
pub mod seed;
pub mod store;
pub mod week;

pub use catalog::{Challenge, ChallengeCatalog, ChallengeCategory, ChallengeInstance};
pub use celebration::Celebration;
pub use config::ChallengeConfig;
pub use engine::{CompletionEngine, CompletionOutcome, DailyBoard};
pub use error::{AlreadyCompleted, ChallengeError};
pub use level::{level_for, LevelProgress, RewardTier, POINTS_PER_LEVEL};
pub use notify::{NotificationKind, Notifier, TracingNotifier};
pub use seed::{canonical_date, select_challenge};
pub use store::{FileStore, KeyValueStore, MemoryStore, ProgressState, ProgressStore};
pub use week::{project_week, week_overview, DayPosition, WeekDay};
