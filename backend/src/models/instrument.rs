//! Instrument catalogue for the GONG H-alpha network.
//!
//! Each [`Instrument`] resolves to the [`InstrumentFilter`] the archive is
//! queried with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::search_result::ObservationRecord;
use crate::error::{SamplerError, SamplerResult};

/// Instrument name the archive uses for the network.
pub const GONG_INSTRUMENT: &str = "GONG";

/// Data provider hosting GONG observations.
pub const GONG_PROVIDER: &str = "NSO";

/// A supported archive instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    /// Every GONG site
    Gong,
    BigBear,
    Learmonth,
    Udaipur,
    ElTeide,
    CerroTololo,
    MaunaLoa,
}

impl Instrument {
    pub const ALL: [Instrument; 7] = [
        Instrument::Gong,
        Instrument::BigBear,
        Instrument::Learmonth,
        Instrument::Udaipur,
        Instrument::ElTeide,
        Instrument::CerroTololo,
        Instrument::MaunaLoa,
    ];

    /// Canonical lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Gong => "gong",
            Instrument::BigBear => "bigbear",
            Instrument::Learmonth => "learmonth",
            Instrument::Udaipur => "udaipur",
            Instrument::ElTeide => "elteide",
            Instrument::CerroTololo => "cerrotololo",
            Instrument::MaunaLoa => "maunaloa",
        }
    }

    /// Two-letter GONG site code, `None` for the whole network.
    pub fn site_code(&self) -> Option<&'static str> {
        match self {
            Instrument::Gong => None,
            Instrument::BigBear => Some("BB"),
            Instrument::Learmonth => Some("LE"),
            Instrument::Udaipur => Some("UD"),
            Instrument::ElTeide => Some("TD"),
            Instrument::CerroTololo => Some("CT"),
            Instrument::MaunaLoa => Some("ML"),
        }
    }

    /// Archive filter for this instrument.
    pub fn filter(&self) -> InstrumentFilter {
        InstrumentFilter {
            instrument: GONG_INSTRUMENT.to_string(),
            provider: GONG_PROVIDER.to_string(),
            source: self.site_code().map(str::to_string),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = SamplerError;

    /// Case-insensitive; spaces, `-` and `_` are ignored, site codes accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        let instrument = match normalized.as_str() {
            "gong" | "all" => Instrument::Gong,
            "bigbear" | "bb" => Instrument::BigBear,
            "learmonth" | "le" => Instrument::Learmonth,
            "udaipur" | "ud" => Instrument::Udaipur,
            "elteide" | "teide" | "td" => Instrument::ElTeide,
            "cerrotololo" | "ct" => Instrument::CerroTololo,
            "maunaloa" | "ml" => Instrument::MaunaLoa,
            _ => return Err(SamplerError::UnknownInstrument(s.to_string())),
        };
        Ok(instrument)
    }
}

/// Map an instrument name to its archive filter.
pub fn resolve_instrument(name: &str) -> SamplerResult<InstrumentFilter> {
    name.parse::<Instrument>().map(|instrument| instrument.filter())
}

/// The archive-side selection an instrument resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentFilter {
    pub instrument: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl InstrumentFilter {
    /// Whether a record satisfies this filter (case-insensitive).
    pub fn matches(&self, record: &ObservationRecord) -> bool {
        if !record.instrument.eq_ignore_ascii_case(&self.instrument)
            || !record.provider.eq_ignore_ascii_case(&self.provider)
        {
            return false;
        }
        match (&self.source, &record.source) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for InstrumentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}/{}/{}", self.provider, self.instrument, source),
            None => write!(f, "{}/{}", self.provider, self.instrument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time::parse_timestamp;

    fn record(source: Option<&str>) -> ObservationRecord {
        ObservationRecord::new(
            "gong/20120101000014",
            "nso",
            "gong",
            parse_timestamp("2012-01-01 00:00:14").unwrap(),
        )
        .with_source(source)
    }

    #[test]
    fn test_parse_canonical_names() {
        for instrument in Instrument::ALL {
            assert_eq!(instrument.name().parse::<Instrument>().unwrap(), instrument);
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!("Mauna Loa".parse::<Instrument>().unwrap(), Instrument::MaunaLoa);
        assert_eq!("big_bear".parse::<Instrument>().unwrap(), Instrument::BigBear);
        assert_eq!("CERRO-TOLOLO".parse::<Instrument>().unwrap(), Instrument::CerroTololo);
        assert_eq!("ud".parse::<Instrument>().unwrap(), Instrument::Udaipur);
    }

    #[test]
    fn test_unknown_instrument() {
        let err = "hinode".parse::<Instrument>().unwrap_err();
        match err {
            SamplerError::UnknownInstrument(name) => assert_eq!(name, "hinode"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(resolve_instrument("").is_err());
    }

    #[test]
    fn test_resolve_filter() {
        let filter = resolve_instrument("maunaloa").unwrap();
        assert_eq!(filter.instrument, "GONG");
        assert_eq!(filter.provider, "NSO");
        assert_eq!(filter.source.as_deref(), Some("ML"));
        assert_eq!(filter.to_string(), "NSO/GONG/ML");
    }

    #[test]
    fn test_network_filter_matches_any_site() {
        let filter = Instrument::Gong.filter();
        assert!(filter.matches(&record(Some("ML"))));
        assert!(filter.matches(&record(None)));
    }

    #[test]
    fn test_site_filter_requires_site() {
        let filter = Instrument::MaunaLoa.filter();
        assert!(filter.matches(&record(Some("ml"))));
        assert!(!filter.matches(&record(Some("BB"))));
        assert!(!filter.matches(&record(None)));
    }
}
