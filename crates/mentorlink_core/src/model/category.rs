//! Performance category derived from a student's grade history.
//!
//! # Invariants
//! - Classification is a pure function of `(current_year, scores)`.
//! - Missing years and missing terms are skipped, never treated as zero.
//! - No recorded scores means an average of 0, i.e. `LowRange`.

use crate::model::person::{Person, StudentProfile};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Inclusive lower bound for `Topper`.
pub const TOPPER_THRESHOLD: f64 = 8.5;
/// Inclusive lower bound for `MidRange`.
pub const MID_RANGE_THRESHOLD: f64 = 6.0;

/// Performance tier used to partition students during bulk assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Topper,
    MidRange,
    LowRange,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Topper, Self::MidRange, Self::LowRange];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topper => "topper",
            Self::MidRange => "mid-range",
            Self::LowRange => "low-range",
        }
    }

    /// Maps an average score onto a tier.
    pub fn from_average(average: f64) -> Self {
        if average >= TOPPER_THRESHOLD {
            Self::Topper
        } else if average >= MID_RANGE_THRESHOLD {
            Self::MidRange
        } else {
            Self::LowRange
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean of all recorded term scores from year 1 through `current_year`,
/// rounded to two decimals. Returns 0 when nothing is recorded.
pub fn average_score(profile: &StudentProfile) -> f64 {
    let Some(current_year) = profile.current_year else {
        return 0.0;
    };

    let (total, count) = (1..=current_year)
        .filter_map(|year| profile.scores.get(&year))
        .flat_map(|scores| scores.recorded())
        .fold((0.0_f64, 0_u32), |(total, count), score| {
            (total + score, count + 1)
        });

    if count == 0 {
        return 0.0;
    }

    round_to_hundredths(total / f64::from(count))
}

/// Classifies a student profile.
pub fn classify(profile: &StudentProfile) -> Category {
    Category::from_average(average_score(profile))
}

/// Classifies a person. Returns `None` for mentors.
///
/// A student record without a profile is classified as having no scores.
pub fn category(person: &Person) -> Option<Category> {
    if !person.is_student() {
        return None;
    }

    Some(match person.student.as_ref() {
        Some(profile) => classify(profile),
        None => Category::LowRange,
    })
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
