//! Daily-note title detection.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

// "October 18th, 2026"
static ORDINAL_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+) (\d{1,2})(?:st|nd|rd|th), (\d{4})$").unwrap()
});

/// Parse a page title as a daily-note date.
///
/// Accepts the outliner's long form (`October 18th, 2026`), ISO dates
/// (`2026-10-18`) and US dashed dates (`10-18-2026`).
pub fn parse_daily_title(title: &str) -> Option<NaiveDate> {
    let title = title.trim();

    if let Some(cap) = ORDINAL_TITLE.captures(title) {
        let normalized = format!("{} {}, {}", &cap[1], &cap[2], &cap[3]);
        return NaiveDate::parse_from_str(&normalized, "%B %d, %Y").ok();
    }

    NaiveDate::parse_from_str(title, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(title, "%m-%d-%Y"))
        .ok()
}

/// Whether a page title names a daily note.
pub fn is_daily_title(title: &str) -> bool {
    parse_daily_title(title).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_form() {
        assert_eq!(
            parse_daily_title("October 18th, 2026"),
            NaiveDate::from_ymd_opt(2026, 10, 18)
        );
        assert_eq!(
            parse_daily_title("March 1st, 2024"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_iso_and_dashed() {
        assert!(is_daily_title("2026-10-18"));
        assert!(is_daily_title("10-18-2026"));
    }

    #[test]
    fn test_not_daily() {
        assert!(!is_daily_title("Project Alpha"));
        assert!(!is_daily_title("February 30th, 2024"));
        assert!(!is_daily_title("Smarch 3rd, 2024"));
    }
}
