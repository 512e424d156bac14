use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verdict for one monitored item on one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceState {
    /// No conclusive observation yet
    #[default]
    Unknown,
    Compliant,
    NonCompliant,
}

impl ComplianceState {
    pub const ALL: [ComplianceState; 3] = [
        ComplianceState::Unknown,
        ComplianceState::Compliant,
        ComplianceState::NonCompliant,
    ];

    /// Fold one observation into the current verdict.
    ///
    /// An inconclusive observation never changes a verdict, and a verdict never
    /// returns to `Unknown` once it has left it.
    pub fn merge(self, observed: ComplianceState) -> ComplianceState {
        use ComplianceState::*;
        match (self, observed) {
            (current, Unknown) => current,
            (Unknown, observed) => observed,
            (Compliant, NonCompliant) => NonCompliant,
            (NonCompliant, Compliant) => Compliant,
            (current, _) => current,
        }
    }

    pub fn is_known(self) -> bool {
        self != ComplianceState::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceState::Unknown => "UNKNOWN",
            ComplianceState::Compliant => "COMPLIANT",
            ComplianceState::NonCompliant => "NON_COMPLIANT",
        }
    }
}

impl fmt::Display for ComplianceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized compliance state {0:?}")]
pub struct ParseComplianceStateError(pub String);

impl FromStr for ComplianceState {
    type Err = ParseComplianceStateError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ComplianceState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseComplianceStateError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::ComplianceState::*;
    use super::*;

    #[test]
    fn test_merge_table() {
        let cases = [
            (Unknown, Unknown, Unknown),
            (Unknown, Compliant, Compliant),
            (Unknown, NonCompliant, NonCompliant),
            (Compliant, Unknown, Compliant),
            (Compliant, Compliant, Compliant),
            (Compliant, NonCompliant, NonCompliant),
            (NonCompliant, Unknown, NonCompliant),
            (NonCompliant, Compliant, Compliant),
            (NonCompliant, NonCompliant, NonCompliant),
        ];
        for (current, observed, expected) in cases {
            assert_eq!(current.merge(observed), expected, "{current} + {observed}");
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("compliant".parse::<ComplianceState>(), Ok(Compliant));
        assert_eq!(" Non_Compliant ".parse::<ComplianceState>(), Ok(NonCompliant));
        assert_eq!("UNKNOWN".parse::<ComplianceState>(), Ok(Unknown));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("maybe".parse::<ComplianceState>().is_err());
        assert!("NON-COMPLIANT".parse::<ComplianceState>().is_err());
        assert!("".parse::<ComplianceState>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&NonCompliant).unwrap(), "\"NON_COMPLIANT\"");
        let parsed: ComplianceState = serde_json::from_str("\"COMPLIANT\"").unwrap();
        assert_eq!(parsed, Compliant);
    }
}
