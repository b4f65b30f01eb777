// src/analytics.rs
//
// Read-side computations over persisted attempts and goals: streaks,
// activity heatmap, goal progress and award tiers. Everything here is
// pure; the stats and goal handlers feed it rows and ship the results.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Days, FixedOffset, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::goal::{AwardTier, GoalProgress};

/// Parses a caller-supplied UTC offset of the form "+HH:MM" / "-HH:MM",
/// used to bucket attempt timestamps into the caller's calendar days.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, AppError> {
    static OFFSET_RE: OnceLock<Regex> = OnceLock::new();
    let re = OFFSET_RE.get_or_init(|| Regex::new(r"^([+-])(\d{2}):(\d{2})$").expect("valid regex"));

    let invalid = || AppError::BadRequest(format!("Invalid timezone offset: {raw}"));

    let caps = re.captures(raw).ok_or_else(invalid)?;
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    let mut seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        seconds = -seconds;
    }

    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

/// Current and longest consecutive-day activity runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub current: i64,
    pub longest: i64,
}

/// Computes streaks from the calendar dates with at least one completed
/// attempt. The current streak is 0 unless the most recent active day is
/// today or yesterday; it then extends backwards while consecutive days
/// differ by exactly one. The longest streak scans every run in the
/// history, not just the most recent one.
pub fn streaks(active_dates: &[NaiveDate], today: NaiveDate) -> Streaks {
    let mut dates = active_dates.to_vec();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    if dates.is_empty() {
        return Streaks {
            current: 0,
            longest: 0,
        };
    }

    let mut longest = 1i64;
    let mut run = 1i64;
    for pair in dates.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let head = dates[0];
    let yesterday = today.pred_opt().unwrap_or(today);
    let mut current = 0i64;
    if head == today || head == yesterday {
        current = 1;
        for pair in dates.windows(2) {
            if (pair[0] - pair[1]).num_days() == 1 {
                current += 1;
            } else {
                break;
            }
        }
    }

    Streaks { current, longest }
}

/// One day of the activity heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapEntry {
    pub date: NaiveDate,
    pub count: i64,
    /// Display intensity bucket, 0 (empty) through 4.
    pub level: u8,
}

/// Display bucket for a daily attempt count: 0, 1-5, 6-15, 16-30, >30.
pub fn intensity_level(count: i64) -> u8 {
    match count {
        0 => 0,
        1..=5 => 1,
        6..=15 => 2,
        16..=30 => 3,
        _ => 4,
    }
}

/// Builds the trailing 365-day activity heatmap ending today. Every day in
/// the window gets an entry, zero-count days included, so clients can
/// render a uniform calendar.
pub fn heatmap(daily_counts: &HashMap<NaiveDate, i64>, today: NaiveDate) -> Vec<HeatmapEntry> {
    (0..365u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| {
            let count = daily_counts.get(&date).copied().unwrap_or(0);
            HeatmapEntry {
                date,
                count,
                level: intensity_level(count),
            }
        })
        .collect()
}

/// Derives goal progress from the best recorded score per target exam.
/// `best_scores` holds one entry per exam with at least one attempt;
/// exams never attempted contribute to `total` only.
pub fn goal_progress(passing_score: i64, target_exams: usize, best_scores: &[i64]) -> GoalProgress {
    let completed = best_scores.iter().filter(|s| **s >= passing_score).count() as i64;
    let total = target_exams.max(1) as i64;
    let percentage = (completed as f64 / total as f64 * 100.0).round() as i64;

    let average_score = if best_scores.is_empty() {
        0
    } else {
        (best_scores.iter().sum::<i64>() as f64 / best_scores.len() as f64).round() as i64
    };

    GoalProgress {
        completed,
        total,
        percentage,
        average_score,
    }
}

/// Maps a goal's average best-exam score to its award tier.
pub fn award_tier(average_score: i64) -> AwardTier {
    match average_score {
        s if s >= 100 => AwardTier::Perfect,
        s if s >= 95 => AwardTier::Diamond,
        s if s >= 90 => AwardTier::Gold,
        s if s >= 80 => AwardTier::Silver,
        _ => AwardTier::Bronze,
    }
}

/// Formats accumulated exam time as "<H>h <M>m", or "<M>m" under an hour.
pub fn format_total_time(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
