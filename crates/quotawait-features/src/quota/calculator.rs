use super::zones::resolve_zone;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use quotawait_config::ScheduleSettings;
use quotawait_protocol::{NoticeVariant, QuotaNotice, ResetSchedule};

/// Turns a quota notice plus "now" into a [`ResetSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTimeCalculator {
    safety_buffer_secs: u64,
    stale_fallback_secs: u64,
}

impl Default for ResetTimeCalculator {
    fn default() -> Self {
        Self::new(&ScheduleSettings::default())
    }
}

impl ResetTimeCalculator {
    pub fn new(settings: &ScheduleSettings) -> Self {
        Self {
            safety_buffer_secs: settings.safety_buffer_secs,
            stale_fallback_secs: settings.stale_fallback_secs,
        }
    }

    pub fn with_buffer(mut self, safety_buffer_secs: u64) -> Self {
        self.safety_buffer_secs = safety_buffer_secs;
        self
    }

    /// Compute against `now`. Call again after any restart; never reuse
    /// `wait_seconds` from an older schedule.
    pub fn calculate(&self, notice: &QuotaNotice, now: DateTime<Utc>) -> ResetSchedule {
        let schedule = match &notice.variant {
            NoticeVariant::Epoch { epoch_seconds } => self.from_epoch(*epoch_seconds, now),
            NoticeVariant::ClockWithZone {
                hour,
                minute,
                meridiem,
                zone,
            } => {
                let resolved = resolve_zone(zone);
                let time = NaiveTime::from_hms_opt(meridiem.to_24h(*hour).min(23), (*minute).min(59), 0)
                    .unwrap_or(NaiveTime::MIN);
                let reset_instant = next_occurrence(resolved.tz, time, now);
                let until = (reset_instant - now).num_seconds().max(0) as u64;

                ResetSchedule {
                    reset_instant,
                    wait_seconds: until + self.safety_buffer_secs,
                    safety_buffer_seconds: self.safety_buffer_secs,
                    computed_at: now,
                    zone: resolved.tz.name().to_string(),
                    zone_fallback: resolved.fallback,
                    stale: false,
                }
            }
        };

        tracing::info!(
            reset_instant = %schedule.reset_instant,
            wait_seconds = schedule.wait_seconds,
            zone = %schedule.zone,
            stale = schedule.stale,
            zone_fallback = schedule.zone_fallback,
            now = %now,
            "computed reset schedule"
        );

        schedule
    }

    fn from_epoch(&self, epoch_seconds: i64, now: DateTime<Utc>) -> ResetSchedule {
        let reset_instant = Utc.timestamp_opt(epoch_seconds, 0).single();

        let (reset_instant, wait_seconds, stale) = match reset_instant {
            Some(instant) if instant > now => {
                let until = (instant - now).num_seconds().max(0) as u64;
                (instant, until + self.safety_buffer_secs, false)
            }
            // Already elapsed (or unrepresentable): the notice is stale and an
            // immediate retry would hit the same wall.
            Some(instant) => (instant, self.stale_fallback_secs, true),
            None => (now, self.stale_fallback_secs, true),
        };

        ResetSchedule {
            reset_instant,
            wait_seconds,
            safety_buffer_seconds: self.safety_buffer_secs,
            computed_at: now,
            zone: "UTC".to_string(),
            zone_fallback: false,
            stale,
        }
    }
}

/// The next instant strictly after `now` at which the wall clock in `tz` reads `time`.
fn next_occurrence(tz: Tz, time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let candidate = localize(tz, today.and_time(time));
    if candidate > now {
        return candidate;
    }

    let tomorrow = today.succ_opt().unwrap_or(NaiveDate::MAX);
    localize(tz, tomorrow.and_time(time))
}

/// Map a wall-clock time in `tz` to UTC. Ambiguous times (clocks turned back)
/// take the earlier instant; times inside a DST gap move forward an hour.
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }
    let shifted = naive + Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use quotawait_protocol::Meridiem;

    fn calculator() -> ResetTimeCalculator {
        ResetTimeCalculator::default()
    }

    fn at(epoch: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(epoch, 0).unwrap()
    }

    fn epoch_notice(epoch_seconds: i64) -> QuotaNotice {
        QuotaNotice {
            raw_text: format!("X usage limit reached|{}", epoch_seconds),
            variant: NoticeVariant::Epoch { epoch_seconds },
        }
    }

    fn clock_notice(hour: u32, minute: u32, meridiem: Meridiem, zone: &str) -> QuotaNotice {
        QuotaNotice {
            raw_text: format!("reset at {}:{:02}{} ({})", hour, minute, meridiem, zone),
            variant: NoticeVariant::ClockWithZone {
                hour,
                minute,
                meridiem,
                zone: zone.to_string(),
            },
        }
    }

    fn berlin(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Tz::Europe__Berlin
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_epoch_in_future_adds_buffer_exactly() {
        let schedule = calculator().calculate(&epoch_notice(1_754_578_800), at(1_754_578_000));
        assert_eq!(schedule.wait_seconds, 920);
        assert_eq!(schedule.reset_instant, at(1_754_578_800));
        assert_eq!(schedule.safety_buffer_seconds, 120);
        assert_eq!(schedule.computed_at, at(1_754_578_000));
        assert!(!schedule.stale);
    }

    #[test]
    fn test_epoch_wait_formula_over_range() {
        let calc = calculator().with_buffer(45);
        let now = at(1_700_000_000);
        for delta in [1_i64, 59, 3_600, 18_000, 86_400 * 3] {
            let schedule = calc.calculate(&epoch_notice(1_700_000_000 + delta), now);
            assert_eq!(schedule.wait_seconds, delta as u64 + 45);
        }
    }

    #[test]
    fn test_epoch_in_past_uses_fallback() {
        let now = at(1_754_578_800);
        for epoch in [1_754_578_800, 1_754_578_799, 1_000, 0, -5] {
            let schedule = calculator().calculate(&epoch_notice(epoch), now);
            assert_eq!(schedule.wait_seconds, 300, "epoch {epoch}");
            assert!(schedule.stale);
        }
    }

    #[test]
    fn test_epoch_unrepresentable_is_stale() {
        let now = at(1_754_578_800);
        let schedule = calculator().calculate(&epoch_notice(i64::MAX), now);
        assert!(schedule.stale);
        assert_eq!(schedule.wait_seconds, 300);
    }

    #[test]
    fn test_clock_later_today() {
        let now = berlin(2025, 8, 7, 16, 30);
        let schedule = calculator().calculate(&clock_notice(5, 0, Meridiem::Pm, "Europe/Berlin"), now);

        assert_eq!(schedule.reset_instant, berlin(2025, 8, 7, 17, 0));
        assert_eq!(schedule.wait_seconds, 30 * 60 + 120);
        assert_eq!(schedule.zone, "Europe/Berlin");
        assert!(!schedule.zone_fallback);
    }

    #[test]
    fn test_clock_already_passed_rolls_to_tomorrow() {
        let now = berlin(2025, 8, 7, 17, 30);
        let schedule = calculator().calculate(&clock_notice(5, 0, Meridiem::Pm, "Europe/Berlin"), now);

        assert_eq!(schedule.reset_instant, berlin(2025, 8, 8, 17, 0));
        assert_eq!(schedule.wait_seconds, 23 * 3600 + 30 * 60 + 120);
    }

    #[test]
    fn test_clock_exactly_now_rolls_to_tomorrow() {
        let now = berlin(2025, 8, 7, 17, 0);
        let schedule = calculator().calculate(&clock_notice(5, 0, Meridiem::Pm, "Europe/Berlin"), now);
        assert_eq!(schedule.reset_instant, berlin(2025, 8, 8, 17, 0));
    }

    #[test]
    fn test_clock_passed_lands_on_next_calendar_day_in_zone() {
        let tz = Tz::America__New_York;
        let notice = clock_notice(9, 15, Meridiem::Am, "America/New_York");
        for hour in [10, 12, 18, 23] {
            let now = tz
                .with_ymd_and_hms(2025, 3, 14, hour, 0, 0)
                .unwrap()
                .with_timezone(&Utc);
            let schedule = calculator().calculate(&notice, now);
            let local = schedule.reset_instant.with_timezone(&tz);
            assert_eq!(
                local.date_naive(),
                NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
            );
            assert_eq!((local.hour(), local.minute()), (9, 15));
        }
    }

    #[test]
    fn test_clock_midnight_rollover_across_utc_date() {
        // 23:50 in Tokyo is 14:50 UTC; a 12am reset is ten minutes away on the next local day.
        let tz = Tz::Asia__Tokyo;
        let now = tz
            .with_ymd_and_hms(2025, 1, 31, 23, 50, 0)
            .unwrap()
            .with_timezone(&Utc);
        let schedule = calculator().calculate(&clock_notice(12, 0, Meridiem::Am, "Asia/Tokyo"), now);
        assert_eq!(schedule.wait_seconds, 600 + 120);
        let local = schedule.reset_instant.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_clock_dst_gap_moves_forward() {
        // 2:30am does not exist in Berlin on 2025-03-30.
        let now = berlin(2025, 3, 30, 1, 0);
        let schedule = calculator().calculate(&clock_notice(2, 30, Meridiem::Am, "Europe/Berlin"), now);
        let local = schedule.reset_instant.with_timezone(&Tz::Europe__Berlin);
        assert_eq!((local.hour(), local.minute()), (3, 30));
        assert!(schedule.reset_instant > now);
    }

    #[test]
    fn test_clock_unknown_zone_falls_back_to_utc() {
        let now = at(1_754_578_000);
        let schedule = calculator().calculate(&clock_notice(5, 0, Meridiem::Pm, "Nowhere/Special"), now);
        assert!(schedule.zone_fallback);
        assert_eq!(schedule.zone, "UTC");
        assert_eq!(schedule.reset_instant.hour(), 17);
    }

    #[test]
    fn test_buffer_never_subtracted() {
        let now = berlin(2025, 8, 7, 16, 59);
        let schedule = calculator().calculate(&clock_notice(5, 0, Meridiem::Pm, "Europe/Berlin"), now);
        assert!(schedule.resume_at() > schedule.reset_instant);
    }
}
