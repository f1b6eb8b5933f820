use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::primer::{
    FixedPositionMatcher, FixedRegionExtractor, GapPenalty, LocalMatcher, MaskMode, Matcher,
    MatcherKind, PrimerSet, ScoringModel,
};
use crate::runtime::Error;

pub const DEFAULT_MAX_ERROR: f64 = 0.2;
pub const DEFAULT_MAX_LEN: usize = 50;
pub const DEFAULT_START: usize = 0;
pub const DEFAULT_BARCODE_FIELD: &str = "BARCODE";
pub const DEFAULT_PRIMER_FIELD: &str = "PRIMER";

/// Everything a worker needs to know to turn one read into a result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MaskConfig {
    pub matcher: MatcherKind,
    pub mode: MaskMode,
    pub max_error: f64,
    pub start: usize,
    pub length: usize,
    pub max_len: usize,
    pub rev_primer: bool,
    pub skip_rc: bool,
    pub barcode: bool,
    pub barcode_field: String,
    pub primer_field: String,
    pub gap_penalty: GapPenalty,
}

impl Default for MaskConfig {
    fn default() -> Self {
        MaskConfig {
            matcher: MatcherKind::default(),
            mode: MaskMode::default(),
            max_error: DEFAULT_MAX_ERROR,
            start: DEFAULT_START,
            length: 0,
            max_len: DEFAULT_MAX_LEN,
            rev_primer: false,
            skip_rc: false,
            barcode: false,
            barcode_field: DEFAULT_BARCODE_FIELD.to_string(),
            primer_field: DEFAULT_PRIMER_FIELD.to_string(),
            gap_penalty: GapPenalty::default(),
        }
    }
}

impl MaskConfig {
    /// Reject settings that cannot produce a meaningful run. Parameters that
    /// the selected matcher ignores are not checked.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.max_error) {
            return Err(Error::invalid_config(
                "max_error",
                Some("must be within [0, 1]"),
            ));
        }
        if self.primer_field.is_empty() {
            return Err(Error::invalid_config("primer_field", Some("must not be empty")));
        }
        if self.barcode && self.barcode_field.is_empty() {
            return Err(Error::invalid_config("barcode_field", Some("must not be empty")));
        }

        match self.matcher {
            MatcherKind::Local => {
                if self.max_len == 0 {
                    return Err(Error::invalid_config("max_len", Some("must be positive")));
                }
                self.gap_penalty.validate()?;
            }
            MatcherKind::FixedPosition => {}
            MatcherKind::FixedRegion => {
                if self.length == 0 {
                    return Err(Error::invalid_config("length", Some("must be positive")));
                }
            }
        }
        Ok(())
    }

    /// Validate and build the matcher for this configuration. Primer-based
    /// matchers need a non-empty primer set; when `rev_primer` is set the
    /// primers are reverse complemented here, so the set is given as written
    /// in the primer file.
    pub fn build_matcher(&self, primers: Option<PrimerSet>) -> Result<Matcher, Error> {
        self.validate()?;

        let primers = if self.matcher.uses_primers() {
            let primers = primers
                .filter(|p| !p.is_empty())
                .ok_or_else(|| Error::invalid_config("primers", Some("no primers given")))?;
            Some(if self.rev_primer {
                primers.revcomp()
            } else {
                primers
            })
        } else {
            None
        };

        let scoring = ScoringModel::new(1, 0, self.gap_penalty);
        let matcher = match (self.matcher, primers) {
            (MatcherKind::Local, Some(primers)) => Matcher::Local(Arc::new(LocalMatcher::new(
                primers,
                scoring,
                self.max_len,
                self.rev_primer,
                self.skip_rc,
            )?)),
            (MatcherKind::FixedPosition, Some(primers)) => Matcher::FixedPosition(Arc::new(
                FixedPositionMatcher::new(primers, scoring, self.start, self.rev_primer),
            )),
            (MatcherKind::FixedRegion, _) => Matcher::FixedRegion(FixedRegionExtractor::new(
                self.start,
                self.length,
                self.rev_primer,
            )),
            (_, None) => {
                return Err(Error::invalid_config("primers", Some("no primers given")));
            }
        };
        Ok(matcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MaskConfig::default();
        assert_eq!(config.max_error, 0.2);
        assert_eq!(config.max_len, 50);
        assert_eq!(config.mode, MaskMode::Mask);
        assert_eq!(config.gap_penalty, GapPenalty { open: 1, extend: 1 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_max_error() {
        let config = MaskConfig {
            max_error: 1.5,
            ..MaskConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid configuration for 'max_error' (must be within [0, 1])"
        );

        let config = MaskConfig {
            max_error: f64::NAN,
            ..MaskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_region() {
        let config = MaskConfig {
            matcher: MatcherKind::FixedRegion,
            length: 0,
            ..MaskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_primer_matchers_need_primers() {
        let config = MaskConfig::default();
        assert!(config.build_matcher(None).is_err());
        assert!(config
            .build_matcher(Some(PrimerSet::default()))
            .is_err());

        let extract = MaskConfig {
            matcher: MatcherKind::FixedRegion,
            length: 4,
            ..MaskConfig::default()
        };
        assert_eq!(extract.build_matcher(None).unwrap().kind(), MatcherKind::FixedRegion);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MaskConfig = serde_json::from_str(
            r#"{"matcher": "fixed_position", "mode": "cut", "start": 4, "gap_penalty": {"open": 2, "extend": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.matcher, MatcherKind::FixedPosition);
        assert_eq!(config.mode, MaskMode::Cut);
        assert_eq!(config.start, 4);
        assert_eq!(config.primer_field, "PRIMER");
        assert_eq!(config.gap_penalty.open, 2);
    }
}
