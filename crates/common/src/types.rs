use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proquint::{self, SEPARATOR, WORD_LEN};

/// Returned when a string is not a well-formed aggregate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid aggregate id: {0}")]
pub struct InvalidId(pub String);

/// Unique identifier for an aggregate instance.
///
/// Four random bytes, written as two proquint syllables (`"lusab-babad"`).
/// The string form round-trips losslessly through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AggregateId([u8; 4]);

impl AggregateId {
    /// Draws a new random aggregate ID.
    pub fn generate() -> Self {
        Self(rand::random::<u32>().to_be_bytes())
    }

    /// Creates an aggregate ID from raw bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Parses the proquint string form.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        let invalid = || InvalidId(s.to_string());

        let (high, low) = s.split_once(SEPARATOR).ok_or_else(invalid)?;
        if high.len() != WORD_LEN || low.len() != WORD_LEN {
            return Err(invalid());
        }

        let high = proquint::decode_word(high).ok_or_else(invalid)?;
        let low = proquint::decode_word(low).ok_or_else(invalid)?;

        let [a, b] = high.to_be_bytes();
        let [c, d] = low.to_be_bytes();
        Ok(Self([a, b, c, d]))
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(WORD_LEN * 2 + 1);
        proquint::encode_word(u16::from_be_bytes([self.0[0], self.0[1]]), &mut out);
        out.push(SEPARATOR);
        proquint::encode_word(u16::from_be_bytes([self.0[2], self.0[3]]), &mut out);
        f.write_str(&out)
    }
}

impl FromStr for AggregateId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AggregateId {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.to_string()
    }
}

/// An [`AggregateId`] that names a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioId(AggregateId);

impl PortfolioId {
    /// Draws a new random portfolio ID.
    pub fn generate() -> Self {
        Self(AggregateId::generate())
    }

    /// Parses a portfolio ID, rejecting malformed strings.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        AggregateId::parse(s).map(Self)
    }

    /// Returns the untyped aggregate ID.
    pub fn aggregate_id(&self) -> AggregateId {
        self.0
    }
}

impl fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PortfolioId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<AggregateId> for PortfolioId {
    fn from(id: AggregateId) -> Self {
        Self(id)
    }
}

impl From<PortfolioId> for AggregateId {
    fn from(id: PortfolioId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_two_syllables() {
        let id = AggregateId::from_bytes([0x7f, 0x00, 0x00, 0x01]);
        assert_eq!(id.to_string(), "lusab-babad");
    }

    #[test]
    fn parse_preserves_value() {
        let id = AggregateId::generate();
        let parsed = AggregateId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.as_bytes(), id.as_bytes());
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for bad in ["", "lusab", "lusab-", "lusab-babadd", "lusab_babad", "xxxxx-babad"] {
            assert_eq!(AggregateId::parse(bad), Err(InvalidId(bad.to_string())));
        }
    }

    #[test]
    fn aggregate_id_serialization_roundtrip() {
        let id = AggregateId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let deserialized: AggregateId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn deserialize_rejects_invalid_string() {
        let result: Result<AggregateId, _> = serde_json::from_str("\"not-an-id\"");
        assert!(result.is_err());
    }

    #[test]
    fn portfolio_id_wraps_aggregate_id() {
        let aggregate_id = AggregateId::from_bytes([1, 2, 3, 4]);
        let portfolio_id = PortfolioId::from(aggregate_id);
        assert_eq!(portfolio_id.aggregate_id(), aggregate_id);
        assert_eq!(portfolio_id.to_string(), aggregate_id.to_string());
        assert_eq!(PortfolioId::parse(&aggregate_id.to_string()), Ok(portfolio_id));
        assert!(PortfolioId::parse("nope").is_err());
    }
}
