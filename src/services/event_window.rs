use chrono::{DateTime, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWindow {
    Past,
    Future,
    Active,
}

impl EventWindow {
    pub fn permits_submission(self) -> bool {
        matches!(self, EventWindow::Active)
    }

    pub fn describe(self) -> &'static str {
        match self {
            EventWindow::Past => "This event has already ended",
            EventWindow::Future => "This event has not started yet",
            EventWindow::Active => "Event is active",
        }
    }
}

pub fn classify(start: NaiveDateTime, end: NaiveDateTime, now: NaiveDateTime) -> EventWindow {
    if end < now {
        EventWindow::Past
    } else if start > now {
        EventWindow::Future
    } else {
        EventWindow::Active
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the datetime strings the attendance service sends. Offsets, when
/// present, are dropped: bounds are compared as local wall-clock time.
pub fn parse_remote_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| format!("unrecognized datetime '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> NaiveDateTime {
        parse_remote_datetime(raw).unwrap()
    }

    #[test]
    fn classifies_around_a_single_day_event() {
        let start = at("2025-05-20T09:00");
        let end = at("2025-05-20T18:00");

        assert_eq!(classify(start, end, at("2025-05-19T10:00")), EventWindow::Future);
        assert_eq!(classify(start, end, at("2025-05-21T10:00")), EventWindow::Past);
        assert_eq!(classify(start, end, at("2025-05-20T12:00")), EventWindow::Active);
    }

    #[test]
    fn uses_time_of_day_not_just_date() {
        let start = at("2025-05-20 09:00:00");
        let end = at("2025-05-20 18:00:00");

        assert_eq!(classify(start, end, at("2025-05-20T08:59:59")), EventWindow::Future);
        assert_eq!(classify(start, end, at("2025-05-20T18:00:01")), EventWindow::Past);
        assert_eq!(classify(start, end, end), EventWindow::Active);
        assert!(!EventWindow::Past.permits_submission());
    }

    #[test]
    fn accepts_rfc3339_and_rejects_garbage() {
        assert_eq!(at("2025-05-20T09:00:00+05:30"), at("2025-05-20T09:00:00"));
        assert!(parse_remote_datetime("20/05/2025").is_err());
    }
}
