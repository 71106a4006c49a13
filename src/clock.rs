use chrono::{DateTime, Local, NaiveDate, Utc};

/// Calendar and wall-clock access, injectable so the daily-reset logic can be
/// exercised against fixed dates.
pub trait Clock: Send + Sync {
    /// Current calendar day at the local day boundary.
    fn today(&self) -> NaiveDate;
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
