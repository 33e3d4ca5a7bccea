//! Week projection for the weekly overview.
//!
//! Display only: nothing here touches persisted progress.

use crate::catalog::{ChallengeCatalog, ChallengeInstance};
use crate::seed::daily_instance;
use crate::store::ProgressState;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Short day names, Sunday first
pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Sunday at or before the anchor
pub fn week_start(anchor: NaiveDate) -> NaiveDate {
    anchor - Duration::days(anchor.weekday().num_days_from_sunday() as i64)
}

/// Seven instances, Sunday (0) through Saturday (6), of the anchor's week
pub fn project_week(catalog: &ChallengeCatalog, anchor: NaiveDate) -> [ChallengeInstance; 7] {
    let start = week_start(anchor);
    std::array::from_fn(|offset| daily_instance(catalog, start + Duration::days(offset as i64)))
}

/// Where a day sits relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPosition {
    Past,
    Today,
    Future,
}

/// One cell of the weekly overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekDay {
    /// Short day name ("Sun".."Sat")
    pub name: String,
    pub instance: ChallengeInstance,
    pub position: DayPosition,
    pub completed: bool,
}

impl WeekDay {
    /// Past day whose challenge was never completed
    pub fn is_missed(&self) -> bool {
        self.position == DayPosition::Past && !self.completed
    }
}

/// Project the week around `today` and mark completed days
pub fn week_overview(
    catalog: &ChallengeCatalog,
    today: NaiveDate,
    state: &ProgressState,
) -> Vec<WeekDay> {
    project_week(catalog, today)
        .into_iter()
        .enumerate()
        .map(|(index, instance)| {
            let position = match instance.date.cmp(&today) {
                std::cmp::Ordering::Less => DayPosition::Past,
                std::cmp::Ordering::Equal => DayPosition::Today,
                std::cmp::Ordering::Greater => DayPosition::Future,
            };
            let completed = state.is_completed(&instance.key());
            WeekDay {
                name: DAY_NAMES[index].to_string(),
                instance,
                position,
                completed,
            }
        })
        .collect()
}
