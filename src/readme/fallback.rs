//! Fallback-mode documents
//!
//! Used when live generation is impossible: the static fallback keeps the
//! profile presentable and says why, the minimal one is the last resort when
//! even that cannot be produced.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use super::format::{log_timestamp, offset_label, status_timestamp};

/// Error detail used when none is given
pub const DEFAULT_FALLBACK_MESSAGE: &str = "System temporarily unavailable";

/// Heading marker that identifies a fallback-mode document
pub const FALLBACK_MODE_MARKER: &str = "FALLBACK MODE";

/// Hours until the scheduled workflow tries again
const RETRY_INTERVAL_HOURS: i64 = 6;

/// Renders the fallback-mode document
pub fn render_fallback(
    username: &str,
    message: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let message = message.trim();
    let message = if message.is_empty() {
        DEFAULT_FALLBACK_MESSAGE
    } else {
        message
    };
    let checked = status_timestamp(now, offset);
    let next_attempt = log_timestamp(now + Duration::hours(RETRY_INTERVAL_HOURS), offset);
    let logged = log_timestamp(now, offset);
    let zone = offset_label(offset);

    format!(
        r#"# {username}@github ~/profile

```bash
$ system-status --check --fallback-mode
> primary-systems: temporarily offline
> fallback-mode: active
> error-details: {message}
> next-attempt: {next_attempt} ({zone})
```

## {FALLBACK_MODE_MARKER}

**System Notice**: dynamic content generation is temporarily unavailable.

| SYSTEM STATUS | CURRENT STATE |
|---------------|---------------|
| `> user:` {username} | `> mode:` fallback active |
| `> profile:` github.com/{username} | `> last_check:` {checked} ({zone}) |
| `> status:` limited functionality | `> recovery:` automatic, every {RETRY_INTERVAL_HOURS} hours |

```bash
$ error-log --recent --summary
[{logged}] WARN: primary generator offline
[{logged}] INFO: fallback document generated
[{logged}] INFO: next attempt scheduled
```

---

<div align="center">
<sub>Fallback mode active • Generated: {checked} ({zone})</sub>
</div>
"#
    )
}

/// The last-resort document, free of anything that could fail to render
pub fn render_minimal(username: &str) -> String {
    format!(
        "# {username}\n\n\
         **Status:** profile systems temporarily offline.\n\n\
         ---\n\
         *Profile will be restored automatically.*\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn test_fallback_contains_message_and_marker() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let doc = render_fallback("octocat", "GitHub API unreachable", now, ist());

        assert!(doc.starts_with("# octocat@github ~/profile"));
        assert!(doc.contains(FALLBACK_MODE_MARKER));
        assert!(doc.contains("> error-details: GitHub API unreachable"));
        assert!(doc.contains("> next-attempt: 2024-07-15 11:30:00 PM (UTC+05:30)"));
        assert!(doc.contains("[2024-07-15 05:30:00 PM] WARN: primary generator offline"));
    }

    #[test]
    fn test_fallback_default_message() {
        let doc = render_fallback("octocat", "   ", Utc::now(), ist());
        assert!(doc.contains(DEFAULT_FALLBACK_MESSAGE));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let now = Utc::now();
        assert_eq!(
            render_fallback("octocat", "x", now, ist()),
            render_fallback("octocat", "x", now, ist())
        );
    }

    #[test]
    fn test_minimal_document() {
        let doc = render_minimal("octocat");
        assert!(doc.starts_with("# octocat\n"));
        assert!(doc.contains("temporarily offline"));
    }
}
