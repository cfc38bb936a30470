pub(crate) const STATUS_READY: &str = "Ready";

pub(crate) const LOG_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S";
pub(crate) const LOG_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const LOG_SEPARATOR: &str = " | ";

pub(crate) const LOG_RETENTION_DAYS: i64 = 7;
pub(crate) const LOG_MAX_ENTRIES: usize = 10_000;
pub(crate) const LOG_MAX_IN_MEMORY: usize = 100;

pub(crate) const NO_PROFILE_MESSAGE: &str = "No profile selected";
pub(crate) const BUSY_MESSAGE: &str = "Request already in progress";
pub(crate) const EMPTY_PASSWORD_MESSAGE: &str = "Enter a password to connect";
