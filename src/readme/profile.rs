//! Live profile document

use chrono::FixedOffset;

use super::format::{
    activity_lines, footer_timestamp, language_rows, offset_label, relative_time,
    status_timestamp, NO_LANGUAGE_DATA, UNKNOWN_HEAD_COMMIT, UNKNOWN_LAST_PUSH,
};
use crate::data::ProfileData;

/// Renders the live profile document from fetched data
pub fn render_profile(data: &ProfileData, offset: FixedOffset) -> String {
    let user = &data.username;
    let now = data.generated_at;

    let last_push = data
        .last_push
        .map(|time| relative_time(now, time))
        .unwrap_or_else(|| UNKNOWN_LAST_PUSH.to_string());
    let head_commit = data
        .head_commit
        .as_ref()
        .map(|head| format!("{} - {}", head.short_sha, head.summary))
        .unwrap_or_else(|| UNKNOWN_HEAD_COMMIT.to_string());
    let api_status = if data.failed_sources.is_empty() {
        "connected ✓".to_string()
    } else {
        let sources: Vec<&str> = data.failed_sources.iter().map(|f| f.source).collect();
        format!("degraded ({})", sources.join(", "))
    };
    let language_note = if data.languages.is_empty() {
        format!("\n# {NO_LANGUAGE_DATA}")
    } else {
        String::new()
    };

    format!(
        r#"# {user}@github ~/profile LIVE

```bash
$ echo 'initializing dynamic profile shell...'
> booting ── [OK]
> session: interactive (real-time)
> github-api: {api_status}
```

| WHO AM I | LIVE STATUS |
|----------|-------------|
| `> user:` {user} | `> last_updated:` {updated} |
| `> profile:` github.com/{user} | `> timezone:` {zone} |
| `> current_commit:` {head_commit} | `> last_commit:` {last_push} |

## LIVE ACTIVITY MONITOR

```bash
$ tail -f ~/.git_activity.log
{activity}
```

## CODE PERFORMANCE METRICS

```bash
$ analyze-languages --real-time --visual
┌─────────────┬──────────────────────────┬─────────┐
│ Language    │ Usage Distribution       │ Percent │
├─────────────┼──────────────────────────┼─────────┤
{languages}
└─────────────┴──────────────────────────┴─────────┘{language_note}
```

---

<div align="center">

<sub>Auto-generated • Last updated: {footer} ({zone}) • Commit: {head_commit}</sub>

</div>
"#,
        updated = status_timestamp(now, offset),
        zone = offset_label(offset),
        activity = activity_lines(&data.recent_commits, now, offset),
        languages = language_rows(&data.languages),
        footer = footer_timestamp(now, offset),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        CommitEntry, FetchError, HeadCommit, LanguageStats, SourceFailure,
    };
    use crate::readme::format::NO_RECENT_ACTIVITY;
    use chrono::{Duration, Utc};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn empty_profile() -> ProfileData {
        ProfileData {
            username: "octocat".to_string(),
            generated_at: Utc::now(),
            recent_commits: Vec::new(),
            last_push: None,
            languages: LanguageStats::empty(),
            head_commit: None,
            failed_sources: Vec::new(),
        }
    }

    #[test]
    fn test_placeholders_rendered() {
        let doc = render_profile(&empty_profile(), ist());

        assert!(doc.starts_with("# octocat@github ~/profile LIVE"));
        assert!(doc.contains(NO_RECENT_ACTIVITY));
        assert!(doc.contains(NO_LANGUAGE_DATA));
        assert!(doc.contains("`> last_commit:` unknown"));
        assert!(doc.contains("Commit: latest"));
        assert!(doc.contains("github-api: connected ✓"));
    }

    #[test]
    fn test_live_data_rendered() {
        let now = Utc::now();
        let mut data = empty_profile();
        data.generated_at = now;
        data.recent_commits = vec![CommitEntry {
            repo: "hello".to_string(),
            message: "Add tests".to_string(),
            pushed_at: now - Duration::hours(3),
        }];
        data.last_push = Some(now - Duration::hours(3));
        data.head_commit = Some(HeadCommit {
            short_sha: "abc1234".to_string(),
            summary: "Update README".to_string(),
        });
        data.languages
            .add(&[("Rust".to_string(), 100u64)].into_iter().collect());

        let doc = render_profile(&data, ist());

        assert!(doc.contains("COMMIT: \"Add tests\" → hello"));
        assert!(doc.contains("`> last_commit:` 3 hours ago"));
        assert!(doc.contains("abc1234 - Update README"));
        assert!(doc.contains("│ Rust "));
        assert!(!doc.contains(NO_RECENT_ACTIVITY));
        assert!(!doc.contains(NO_LANGUAGE_DATA));
    }

    #[test]
    fn test_degraded_sources_listed() {
        let mut data = empty_profile();
        data.failed_sources.push(SourceFailure {
            source: "languages",
            error: FetchError::Timeout,
        });

        let doc = render_profile(&data, ist());
        assert!(doc.contains("github-api: degraded (languages)"));
    }
}
