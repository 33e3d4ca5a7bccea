//! Level derivation and reward tiers.
//!
//! Levels are flat bands of 500 points: level = points / 500 + 1.
//! Nothing here is stored; everything is recomputed from the point total.

use serde::{Deserialize, Serialize};

/// Points per level band
pub const POINTS_PER_LEVEL: u64 = 500;

/// Level and distance to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u64,
    /// Always in 1..=500
    pub points_to_next: u64,
}

impl LevelProgress {
    /// Fraction of the current band already earned (0.0 - 1.0)
    pub fn band_progress(&self) -> f64 {
        (POINTS_PER_LEVEL - self.points_to_next) as f64 / POINTS_PER_LEVEL as f64
    }
}

impl std::fmt::Display for LevelProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lvl {} ({} to next)", self.level, self.points_to_next)
    }
}

/// Derive the level from a point total
pub fn level_for(total_points: u64) -> LevelProgress {
    LevelProgress {
        level: total_points / POINTS_PER_LEVEL + 1,
        points_to_next: POINTS_PER_LEVEL - total_points % POINTS_PER_LEVEL,
    }
}

/// Points needed to reach a level from zero
pub fn points_for_level(level: u64) -> u64 {
    level.saturating_sub(1) * POINTS_PER_LEVEL
}

/// Badge unlocked on reaching a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardTier {
    pub level: u64,
    /// ASCII badge symbol
    pub badge: &'static str,
    pub name: &'static str,
}

impl RewardTier {
    const fn new(level: u64, badge: &'static str, name: &'static str) -> Self {
        Self { level, badge, name }
    }

    pub fn is_unlocked(&self, level: u64) -> bool {
        level >= self.level
    }

    /// Points needed to reach this tier
    pub fn points_required(&self) -> u64 {
        points_for_level(self.level)
    }
}

/// All reward tiers, lowest first
pub fn reward_tiers() -> Vec<RewardTier> {
    vec![
        RewardTier::new(5, "[Br]", "Bronze Fan Badge"),
        RewardTier::new(10, "[Ag]", "Silver Fan Badge"),
        RewardTier::new(20, "[Au]", "Gold Fan Badge"),
        RewardTier::new(50, "<Di>", "Diamond Fan Badge"),
    ]
}

/// Tiers reached at a level
pub fn unlocked_tiers(level: u64) -> Vec<RewardTier> {
    reward_tiers()
        .into_iter()
        .filter(|t| t.is_unlocked(level))
        .collect()
}

/// Tier most recently crossed between two point totals, if any
pub fn tier_crossed(old_points: u64, new_points: u64) -> Option<RewardTier> {
    let old_level = level_for(old_points).level;
    let new_level = level_for(new_points).level;
    reward_tiers()
        .into_iter()
        .filter(|t| !t.is_unlocked(old_level) && t.is_unlocked(new_level))
        .last()
}
