/// Standard date format used throughout the codebase: "2025-01-15"
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Month key format used for snapshot options: "2025-01"
pub(crate) const MONTH_KEY_FORMAT: &str = "%Y-%m";

/// Refresh tokens are kept for a week, matching the hosted session cookie
pub(crate) const REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Applications untouched for longer than this are reported as stale
pub(crate) const DEFAULT_STALE_DAYS: i64 = 14;

/// Follow-ups are due at 17:00 UTC on the chosen day
pub(crate) const FOLLOW_UP_DUE_HOUR: u32 = 17;

/// Minimum accepted length for a new password
pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) const DEFAULT_LINK_LABEL: &str = "Application Link";
pub(crate) const JOB_LINK_LABEL: &str = "Job Link";
