//! Clearance levels
//!
//! Four ordered tiers gate both record visibility and mutation rights.
//! The numeral ordering is DELTA < GAMMA < BETA < ALPHA.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Clearance level held by a session or required by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClearanceLevel {
    /// Lowest tier
    Delta = 1,
    Gamma = 2,
    Beta = 3,
    /// Full visibility and the only tier allowed to mutate records
    Alpha = 4,
}

impl ClearanceLevel {
    /// All levels in ascending order
    pub const ALL: [ClearanceLevel; 4] = [
        ClearanceLevel::Delta,
        ClearanceLevel::Gamma,
        ClearanceLevel::Beta,
        ClearanceLevel::Alpha,
    ];

    /// Numeral used for ordering comparisons
    pub fn numeral(self) -> u8 {
        self as u8
    }

    /// Upper-case display name
    pub fn as_str(self) -> &'static str {
        match self {
            ClearanceLevel::Delta => "DELTA",
            ClearanceLevel::Gamma => "GAMMA",
            ClearanceLevel::Beta => "BETA",
            ClearanceLevel::Alpha => "ALPHA",
        }
    }

    /// Whether a holder of this level may see something tagged `required`
    pub fn can_view(self, required: ClearanceLevel) -> bool {
        self.numeral() >= required.numeral()
    }

    /// Whether a holder of this level may insert, update or delete records
    pub fn can_modify(self) -> bool {
        self == ClearanceLevel::Alpha
    }
}

impl fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a string names no clearance level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown clearance level: {0}")]
pub struct UnknownClearance(pub String);

impl FromStr for ClearanceLevel {
    type Err = UnknownClearance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DELTA" => Ok(ClearanceLevel::Delta),
            "GAMMA" => Ok(ClearanceLevel::Gamma),
            "BETA" => Ok(ClearanceLevel::Beta),
            "ALPHA" => Ok(ClearanceLevel::Alpha),
            _ => Err(UnknownClearance(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_ordering_matches_numerals() {
        assert!(ClearanceLevel::Delta < ClearanceLevel::Gamma);
        assert!(ClearanceLevel::Gamma < ClearanceLevel::Beta);
        assert!(ClearanceLevel::Beta < ClearanceLevel::Alpha);

        let numerals: Vec<u8> = ClearanceLevel::ALL.iter().map(|l| l.numeral()).collect();
        assert_eq!(numerals, vec![1, 2, 3, 4]);
    }

    #[rstest]
    #[case(ClearanceLevel::Delta, false)]
    #[case(ClearanceLevel::Gamma, false)]
    #[case(ClearanceLevel::Beta, false)]
    #[case(ClearanceLevel::Alpha, true)]
    fn test_only_alpha_modifies(#[case] level: ClearanceLevel, #[case] expected: bool) {
        assert_eq!(level.can_modify(), expected);
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&ClearanceLevel::Beta).unwrap();
        assert_eq!(json, "\"BETA\"");

        let parsed: ClearanceLevel = serde_json::from_str("\"GAMMA\"").unwrap();
        assert_eq!(parsed, ClearanceLevel::Gamma);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("alpha".parse::<ClearanceLevel>().unwrap(), ClearanceLevel::Alpha);
        assert_eq!(" Delta ".parse::<ClearanceLevel>().unwrap(), ClearanceLevel::Delta);
        assert!("OMEGA".parse::<ClearanceLevel>().is_err());
    }
}
