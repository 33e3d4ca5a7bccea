//! Challenge catalog.
//!
//! Static, ordered list of immutable challenge definitions. The order matters:
//! the seed selector indexes into it, so reordering changes which challenge
//! every date maps to.

use crate::error::ChallengeError;
use crate::seed::canonical_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of activity a challenge asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeCategory {
    Explore,
}

impl std::fmt::Display for ChallengeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explore => write!(f, "explore"),
        }
    }
}

/// A challenge template with its reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Stable identifier, part of every instance key
    pub key: String,
    pub title: String,
    pub description: String,
    pub category: ChallengeCategory,
    /// How many items the activity asks for (display only)
    pub target: u32,
    /// Points granted on completion
    pub reward: u64,
    /// Opaque route identifier for the navigation collaborator
    pub link: String,
}

impl Challenge {
    pub fn new(
        key: &str,
        title: &str,
        description: &str,
        target: u32,
        reward: u64,
        link: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: ChallengeCategory::Explore,
            target,
            reward,
            link: link.to_string(),
        }
    }

    /// Bind this challenge to a calendar date
    pub fn on(&self, date: NaiveDate) -> ChallengeInstance {
        ChallengeInstance {
            challenge: self.clone(),
            date,
        }
    }
}

/// A challenge bound to one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInstance {
    pub challenge: Challenge,
    pub date: NaiveDate,
}

impl ChallengeInstance {
    /// Identity key used for persistence: `<challenge key>-<canonical date>`
    pub fn key(&self) -> String {
        format!("{}-{}", self.challenge.key, canonical_date(self.date))
    }

    pub fn reward(&self) -> u64 {
        self.challenge.reward
    }
}

/// Ordered, non-empty list of challenges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeCatalog {
    challenges: Vec<Challenge>,
}

impl ChallengeCatalog {
    /// Build a catalog; an empty list is rejected since selection is modular
    pub fn new(challenges: Vec<Challenge>) -> Result<Self, ChallengeError> {
        if challenges.is_empty() {
            return Err(ChallengeError::EmptyCatalog);
        }
        Ok(Self { challenges })
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Challenge> {
        self.challenges.get(index)
    }

    /// Index the catalog by `seed % len`
    pub fn pick(&self, seed: u64) -> &Challenge {
        &self.challenges[(seed % self.challenges.len() as u64) as usize]
    }

    /// Look up a challenge by its stable key
    pub fn find(&self, key: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter()
    }
}

impl Default for ChallengeCatalog {
    fn default() -> Self {
        Self {
            challenges: default_challenges(),
        }
    }
}

/// The challenges shipped with the app
pub fn default_challenges() -> Vec<Challenge> {
    vec![
        Challenge::new("explore-chars", "Character Explorer", "View 10 character profiles", 10, 40, "/characters"),
        Challenge::new("explore-episodes", "Episode Explorer", "Browse through 15 episodes", 15, 50, "/episodes"),
        Challenge::new("explore-locations", "Location Scout", "Explore 5 Springfield locations", 5, 35, "/locations"),
        Challenge::new("add-favorites", "Collector", "Add 3 items to your favorites", 3, 45, "/favorites"),
        Challenge::new("compare-chars", "Comparison Expert", "Compare 2 characters", 1, 30, "/compare"),
    ]
}
