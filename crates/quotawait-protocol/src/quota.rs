//! Quota notice and reset schedule types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// AM / PM marker of a clock-style reset time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Convert a 12-hour clock hour (1..=12) to 0..=23.
    pub fn to_24h(self, hour: u32) -> u32 {
        match (self, hour % 12) {
            (Self::Am, h) => h,
            (Self::Pm, h) => h + 12,
        }
    }
}

impl std::fmt::Display for Meridiem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Am => write!(f, "am"),
            Self::Pm => write!(f, "pm"),
        }
    }
}

/// The two encodings a reset time can arrive in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeVariant {
    /// `<product> usage limit reached|<unix seconds>`
    Epoch { epoch_seconds: i64 },

    /// `... reset at 5:30pm (Europe/Berlin).`
    ClockWithZone {
        hour: u32,
        minute: u32,
        meridiem: Meridiem,
        zone: String,
    },
}

/// A recognized quota-exhaustion notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaNotice {
    pub raw_text: String,
    pub variant: NoticeVariant,
}

/// When to retry after a quota notice.
///
/// Always computed against a fresh "now"; persisted copies are only used to
/// derive the absolute [`ResetSchedule::resume_at`] target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSchedule {
    /// Instant the provider says the quota resets
    pub reset_instant: DateTime<Utc>,
    /// Seconds to wait from `computed_at`, safety buffer included
    pub wait_seconds: u64,
    pub safety_buffer_seconds: u64,
    /// The "now" this schedule was computed against
    pub computed_at: DateTime<Utc>,
    /// Zone the reset time was resolved in
    pub zone: String,
    /// The notice named a zone we could not resolve; UTC was used instead
    #[serde(default)]
    pub zone_fallback: bool,
    /// The reset instant had already passed; the fallback wait was used
    #[serde(default)]
    pub stale: bool,
}

impl ResetSchedule {
    /// Absolute instant at which waiting ends.
    pub fn resume_at(&self) -> DateTime<Utc> {
        self.computed_at + Duration::seconds(self.wait_seconds as i64)
    }

    /// Seconds left until [`Self::resume_at`], re-read against `now`.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.resume_at() - now).num_seconds().max(0) as u64
    }
}
