use chrono_tz::Tz;

/// A zone identifier resolved to a concrete time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedZone {
    pub tz: Tz,
    /// The identifier was not recognized and UTC was substituted
    pub fallback: bool,
}

// Common abbreviations that are not IANA identifiers themselves. Each maps to a
// representative location so that daylight saving is applied by date.
const ABBREVIATIONS: &[(&str, Tz)] = &[
    ("Z", Tz::UTC),
    ("PST", Tz::America__Los_Angeles),
    ("PDT", Tz::America__Los_Angeles),
    ("PT", Tz::America__Los_Angeles),
    ("MDT", Tz::America__Denver),
    ("MT", Tz::America__Denver),
    ("CST", Tz::America__Chicago),
    ("CDT", Tz::America__Chicago),
    ("CT", Tz::America__Chicago),
    ("EDT", Tz::America__New_York),
    ("ET", Tz::America__New_York),
    ("BST", Tz::Europe__London),
    ("CEST", Tz::Europe__Berlin),
    ("IST", Tz::Asia__Kolkata),
    ("JST", Tz::Asia__Tokyo),
    ("KST", Tz::Asia__Seoul),
    ("AEST", Tz::Australia__Sydney),
    ("AEDT", Tz::Australia__Sydney),
];

/// Resolve an IANA name (`Europe/Berlin`) or a known abbreviation (`PDT`).
///
/// Unknown identifiers fall back to UTC and are reported with a warning; the
/// resulting reset time may be off by the zone's offset.
pub fn resolve_zone(name: &str) -> ResolvedZone {
    let name = name.trim();

    if let Ok(tz) = name.parse::<Tz>() {
        return ResolvedZone {
            tz,
            fallback: false,
        };
    }

    let upper = name.to_ascii_uppercase();
    if let Some((_, tz)) = ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == upper) {
        return ResolvedZone {
            tz: *tz,
            fallback: false,
        };
    }

    // Case-insensitive IANA match, e.g. "europe/berlin"
    if let Ok(tz) = Tz::from_str_insensitive(name) {
        return ResolvedZone {
            tz,
            fallback: false,
        };
    }

    tracing::warn!(zone = %name, "unresolvable time zone in quota notice, falling back to UTC");
    ResolvedZone {
        tz: Tz::UTC,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iana_names() {
        let zone = resolve_zone("Europe/Berlin");
        assert_eq!(zone.tz, Tz::Europe__Berlin);
        assert!(!zone.fallback);

        assert_eq!(resolve_zone("UTC").tz, Tz::UTC);
        assert_eq!(resolve_zone(" Asia/Tokyo ").tz, Tz::Asia__Tokyo);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(resolve_zone("PDT").tz, Tz::America__Los_Angeles);
        assert_eq!(resolve_zone("pst").tz, Tz::America__Los_Angeles);
        assert_eq!(resolve_zone("CEST").tz, Tz::Europe__Berlin);
        assert!(!resolve_zone("JST").fallback);
    }

    #[test]
    fn test_case_insensitive_iana() {
        let zone = resolve_zone("europe/berlin");
        assert_eq!(zone.tz, Tz::Europe__Berlin);
        assert!(!zone.fallback);
    }

    #[test]
    fn test_unknown_falls_back_to_utc() {
        let zone = resolve_zone("Mars/Olympus_Mons");
        assert_eq!(zone.tz, Tz::UTC);
        assert!(zone.fallback);
    }
}
