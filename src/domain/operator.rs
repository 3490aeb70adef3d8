use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Boolean connective joining a filter node to its immediately preceding
/// sibling. The first node in a sequence has no preceding sibling, so its
/// operator is carried as `Option<Operator>` on the node and ignored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    pub const ALL: [Operator; 2] = [Operator::And, Operator::Or];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            _ => Err(ParseOperatorError {
                value: value.to_string(),
            }),
        }
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Operator::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperatorError {
    value: String,
}

impl fmt::Display for ParseOperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid operator '{}': expected one of {}",
            self.value,
            Operator::ALL
                .iter()
                .map(|operator| operator.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseOperatorError {}

#[cfg(test)]
mod tests {
    use super::Operator;
    use std::str::FromStr;

    #[test]
    fn parses_lowercase_and_legacy_uppercase_spellings() {
        assert_eq!(Operator::from_str("and").unwrap(), Operator::And);
        assert_eq!(Operator::from_str("OR").unwrap(), Operator::Or);
        assert_eq!(Operator::from_str(" AND ").unwrap(), Operator::And);
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(Operator::from_str("xor").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Operator::And).unwrap(), "\"and\"");
        let parsed: Operator = serde_json::from_str("\"or\"").unwrap();
        assert_eq!(parsed, Operator::Or);
    }
}
