//! Pure grading functions
//!
//! Grading is stateless: an item plus an answer maps to points, and the
//! session totals fold over the quiz's item list. The three-tier
//! checkbox rule (full / half / nothing) deliberately collapses degrees
//! of wrongness and must stay as-is to match historical scoring.

use std::collections::HashSet;

use serde::Serialize;

use crate::quiz::answer::Answer;
use crate::quiz::config::{Item, ItemKind};

/// Grade tier for a scored answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradeTier {
    /// Full credit
    Correct,
    /// Half credit (checkbox only)
    Partial,
    /// No credit
    Incorrect,
}

impl GradeTier {
    /// Viewer-facing verdict text for this tier
    pub fn verdict(self) -> &'static str {
        match self {
            Self::Correct => "Correct.",
            Self::Partial => "Partially correct.",
            Self::Incorrect => "Incorrect.",
        }
    }

    /// Tier corresponding to a point value on a 1-point item
    fn from_points(points: f64) -> Self {
        if points >= 1.0 {
            Self::Correct
        } else if points > 0.0 {
            Self::Partial
        } else {
            Self::Incorrect
        }
    }
}

/// Final score totals for a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// Points earned across all answered items
    pub points: f64,
    /// Maximum points across all scorable items, answered or not
    pub max_points: f64,
    /// `points / max_points` as a percentage, rounded to two decimals
    pub percent: f64,
}

/// Normalizes an answer string for matching
///
/// Trims surrounding whitespace and lowercases unless the item demands
/// case-sensitive matching.
fn clean_answer(answer: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        answer.trim().to_owned()
    } else {
        answer.trim().to_lowercase()
    }
}

/// Grades a single answer against its item
///
/// Returns `None` for unscorable item kinds (free response, poll,
/// pause) and for answers whose shape does not match the item; both
/// contribute nothing to points.
pub fn grade(item: &Item, answer: &Answer) -> Option<(f64, GradeTier)> {
    let points = match (&item.kind, answer) {
        (ItemKind::Mcq(config), Answer::Mcq { selected }) => {
            let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
            let correct: HashSet<&str> = config.correct.iter().map(String::as_str).collect();
            if !correct.is_empty() && selected == correct {
                1.0
            } else {
                0.0
            }
        }
        (ItemKind::Checkbox(config), Answer::Checkbox { selected }) => {
            let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
            let correct: HashSet<&str> = config.correct.iter().map(String::as_str).collect();
            let correct_selected = selected.intersection(&correct).count();
            let wrong_selected = selected.difference(&correct).count();
            if correct_selected == correct.len() && wrong_selected == 0 && !correct.is_empty() {
                1.0
            } else if correct_selected > 0 {
                0.5
            } else {
                0.0
            }
        }
        (ItemKind::Fib(config), Answer::Fib { text }) => {
            let entered = clean_answer(text, config.case_sensitive);
            let matched = config
                .accept
                .iter()
                .any(|accepted| clean_answer(accepted, config.case_sensitive) == entered);
            if matched { 1.0 } else { 0.0 }
        }
        _ => return None,
    };

    Some((points, GradeTier::from_points(points)))
}

/// Maximum points a single item contributes
pub fn item_max(item: &Item) -> f64 {
    if item.kind.is_scorable() { 1.0 } else { 0.0 }
}

/// Computes the session totals over a quiz and its answered map
///
/// The maximum counts every scorable item whether or not it was
/// answered, so skipping a question can never raise the percentage.
pub fn totals<'a, I>(items: &[Item], answered: I) -> ScoreSummary
where
    I: Fn(&str) -> Option<&'a Answer>,
{
    let mut points = 0.0;
    let mut max_points = 0.0;
    for item in items {
        max_points += item_max(item);
        if let Some(answer) = answered(&item.id) {
            if let Some((earned, _)) = grade(item, answer) {
                points += earned;
            }
        }
    }

    ScoreSummary {
        points,
        max_points,
        percent: percent(points, max_points),
    }
}

/// Percentage with two-decimal rounding; 0 when there is nothing to score
pub fn percent(points: f64, max_points: f64) -> f64 {
    if max_points > 0.0 {
        (points / max_points * 10000.0).round() / 100.0
    } else {
        0.0
    }
}
