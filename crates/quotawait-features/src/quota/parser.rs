use quotawait_protocol::{Meridiem, NoticeVariant, QuotaNotice};
use regex::Regex;
use std::sync::LazyLock;

static EPOCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)usage limit reached\|(\d{1,12})\b").expect("Invalid epoch notice regex")
});

// "Your limit will reset at 5pm (Europe/Berlin)." and the shorter
// "5-hour limit reached ∙ resets 5:30am (UTC)" both match.
static CLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)limit.*?\bresets?(?:\s+at)?\s+(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?\s*\(\s*([^()\s]+)\s*\)",
    )
    .expect("Invalid clock notice regex")
});

/// Outcome of looking at one line for a quota notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaParse {
    Notice(QuotaNotice),
    NotAQuotaMessage,
}

impl QuotaParse {
    pub fn into_notice(self) -> Option<QuotaNotice> {
        match self {
            Self::Notice(notice) => Some(notice),
            Self::NotAQuotaMessage => None,
        }
    }
}

/// Classify one line of text. Total: never fails, never panics.
pub fn parse_quota_notice(line: &str) -> QuotaParse {
    if let Some(caps) = EPOCH_PATTERN.captures(line) {
        if let Ok(epoch_seconds) = caps[1].parse::<i64>() {
            return QuotaParse::Notice(QuotaNotice {
                raw_text: line.trim().to_string(),
                variant: NoticeVariant::Epoch { epoch_seconds },
            });
        }
    }

    if let Some(caps) = CLOCK_PATTERN.captures(line) {
        let hour = caps[1].parse::<u32>().unwrap_or(0);
        let minute = caps
            .get(2)
            .map(|m| m.as_str().parse::<u32>().unwrap_or(60))
            .unwrap_or(0);
        if !(1..=12).contains(&hour) || minute > 59 {
            return QuotaParse::NotAQuotaMessage;
        }

        let meridiem = if caps[3].eq_ignore_ascii_case("a") {
            Meridiem::Am
        } else {
            Meridiem::Pm
        };

        return QuotaParse::Notice(QuotaNotice {
            raw_text: line.trim().to_string(),
            variant: NoticeVariant::ClockWithZone {
                hour,
                minute,
                meridiem,
                zone: caps[4].to_string(),
            },
        });
    }

    QuotaParse::NotAQuotaMessage
}

/// Shorthand for `parse_quota_notice(line).into_notice()`.
pub fn detect_notice(line: &str) -> Option<QuotaNotice> {
    parse_quota_notice(line).into_notice()
}

/// First notice found in `lines`.
pub fn scan_for_notice<'a, I>(lines: I) -> Option<QuotaNotice>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().find_map(detect_notice)
}
