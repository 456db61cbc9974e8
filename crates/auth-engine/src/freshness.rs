//! Cached-session freshness rule.
//!
//! A session is fresh iff `|now - expires_in| < 30 minutes`. The window is
//! symmetric around the stored instant: a stamp up to 30 minutes in the
//! past still reads as fresh. Because `expires_in` is written as issue time
//! plus 30 minutes, a session is effectively reusable from just after issue
//! until 60 minutes after issue. This is not a forward-only expiry check.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use session_storage::SessionData;

/// Width of the freshness window in minutes, and the offset written into
/// `expires_in`.
pub const SESSION_WINDOW_MINUTES: i64 = 30;

/// [`SESSION_WINDOW_MINUTES`] as a duration.
pub fn session_window() -> Duration {
    Duration::minutes(SESSION_WINDOW_MINUTES)
}

/// Serialize the `expires_in` stamp for a session issued at `issued_at`.
pub fn expires_in_for(issued_at: DateTime<Utc>) -> String {
    (issued_at + session_window()).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored `expires_in` stamp. Returns `None` for anything that is not
/// an RFC 3339 timestamp.
pub fn parse_expires_in(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc))
}

/// Whether `session` may be reused at `now`. Unparseable stamps are stale.
pub fn is_session_fresh(session: &SessionData, now: DateTime<Utc>) -> bool {
    match parse_expires_in(&session.expires_in) {
        Some(stamp) => {
            let window = session_window();
            let diff = now.signed_duration_since(stamp);
            diff < window && diff > -window
        }
        None => false,
    }
}
