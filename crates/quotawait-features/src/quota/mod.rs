//! Quota notices: recognition and reset time arithmetic
//!
//! The assistant reports an exhausted quota in one of two shapes:
//!
//! - `Claude AI usage limit reached|1754578800` (unix seconds)
//! - `Claude usage limit reached. Your limit will reset at 5pm (Europe/Berlin).`
//!
//! [`parse_quota_notice`] turns a line into a [`QuotaNotice`](quotawait_protocol::QuotaNotice)
//! and [`ResetTimeCalculator`] turns that notice plus the current instant into a
//! [`ResetSchedule`](quotawait_protocol::ResetSchedule).

pub mod calculator;
pub mod parser;
pub mod zones;

pub use calculator::ResetTimeCalculator;
pub use parser::{detect_notice, parse_quota_notice, scan_for_notice, QuotaParse};
pub use zones::{resolve_zone, ResolvedZone};
