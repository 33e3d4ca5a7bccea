//! Deterministic daily challenge selection.
//!
//! The date is rendered as a fixed English string (`Sat Oct 17 2026`), its
//! character codes are summed, and the sum modulo catalog length picks the
//! challenge. Many dates collide on the same challenge; that is expected.

use crate::catalog::{Challenge, ChallengeCatalog, ChallengeInstance};
use crate::error::ChallengeError;
use chrono::NaiveDate;

/// Canonical textual form of a date, independent of locale and timezone
pub fn canonical_date(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

/// Sum of the character codes of the canonical date
pub fn date_seed(date: NaiveDate) -> u64 {
    canonical_date(date).chars().map(|c| c as u64).sum()
}

/// Pick the challenge assigned to a date
pub fn select_challenge(catalog: &ChallengeCatalog, date: NaiveDate) -> &Challenge {
    catalog.pick(date_seed(date))
}

/// The instance to complete on a given date
pub fn daily_instance(catalog: &ChallengeCatalog, date: NaiveDate) -> ChallengeInstance {
    select_challenge(catalog, date).on(date)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(input: &str) -> Result<NaiveDate, ChallengeError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| ChallengeError::InvalidDate(format!("'{}': {}", input, e)))
}
