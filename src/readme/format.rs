//! Small text formatters shared by the document templates

use chrono::{DateTime, FixedOffset, Utc};

use crate::data::{CommitEntry, LanguageStats};

/// Activity line shown when the events feed has no pushes
pub const NO_RECENT_ACTIVITY: &str = "no recent activity";

/// Note shown when no language bytes could be counted
pub const NO_LANGUAGE_DATA: &str = "no language data available";

/// Shown instead of a commit reference when the head commit is unknown
pub const UNKNOWN_HEAD_COMMIT: &str = "latest";

/// Shown instead of a relative time when the last push is unknown
pub const UNKNOWN_LAST_PUSH: &str = "unknown";

/// Cells in a language usage bar
const BAR_WIDTH: usize = 20;

/// Width of the language name column
const NAME_WIDTH: usize = 11;

/// Languages listed in the usage table
const TOP_LANGUAGES: usize = 5;

/// `2024-07-15 05:30:00 PM` in the display offset
pub fn log_timestamp(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset)
        .format("%Y-%m-%d %I:%M:%S %p")
        .to_string()
}

/// `15/07/2024, 17:30:00` in the display offset
pub fn status_timestamp(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}

/// `July 15 2024, 5:30:00 pm` in the display offset
pub fn footer_timestamp(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset)
        .format("%B %-d %Y, %-I:%M:%S %P")
        .to_string()
}

/// `UTC+05:30`
pub fn offset_label(offset: FixedOffset) -> String {
    format!("UTC{offset}")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Human-readable distance from `then` to `now`
pub fn relative_time(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    match minutes {
        m if m < 1 => "just now".to_string(),
        m if m < 60 => plural(m, "minute"),
        m if m < 1440 => plural(m / 60, "hour"),
        m => plural(m / 1440, "day"),
    }
}

/// The activity log body, one line per commit
pub fn activity_lines(
    commits: &[CommitEntry],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    if commits.is_empty() {
        return format!("[{}] {}", log_timestamp(now, offset), NO_RECENT_ACTIVITY);
    }

    commits
        .iter()
        .map(|commit| {
            format!(
                "[{}] COMMIT: \"{}\" → {}",
                log_timestamp(commit.pushed_at, offset),
                commit.message,
                commit.repo
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Table rows for the language usage box
pub fn language_rows(stats: &LanguageStats) -> String {
    let top = stats.top(TOP_LANGUAGES);
    if top.is_empty() {
        return format!(
            "│ {:<NAME_WIDTH$} │ {}     │  0.0%   │",
            "-",
            "░".repeat(BAR_WIDTH)
        );
    }

    top.iter()
        .map(|share| {
            let percent = share.percent.min(99.9);
            let filled = ((percent / 5.0).round() as usize).min(BAR_WIDTH);
            let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
            let name: String = share.name.chars().take(NAME_WIDTH).collect();
            format!("│ {name:<NAME_WIDTH$} │ {bar}     │ {percent:>4.1}%   │")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
