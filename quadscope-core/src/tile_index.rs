//! Arbitrary-width tile indices.
//!
//! At level L the grid is 2^L × 2^L, so indices outgrow u64 past level
//! 64. Indices are kept as non-negative big integers and only narrowed
//! to machine words on demand.

use crate::error::{CoreError, CoreResult};
use dashu::integer::{IBig, UBig};
use serde::{Deserialize, Serialize};

/// Non-negative tile coordinate along one axis of a quadtree level.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileIndex(UBig);

impl TileIndex {
    pub fn zero() -> Self {
        Self(UBig::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(UBig::from(value))
    }

    /// Build from a signed big integer; negative values are rejected.
    pub fn from_ibig(value: IBig) -> Option<Self> {
        UBig::try_from(value).ok().map(Self)
    }

    /// Parse a plain decimal digit string.
    pub fn parse(input: &str) -> CoreResult<Self> {
        input
            .parse::<UBig>()
            .map(Self)
            .map_err(|e| CoreError::BadCoordinate {
                input: input.to_string(),
                reason: format!("{}", e),
            })
    }

    /// Largest valid index at `level`, i.e. 2^level − 1.
    pub fn max_for_level(level: u32) -> IBig {
        IBig::from(UBig::ONE << level as usize) - IBig::ONE
    }

    /// Narrow to u64 where the caller knows the level is shallow.
    pub fn to_u64(&self) -> CoreResult<u64> {
        u64::try_from(self.0.clone()).map_err(|_| CoreError::IndexTooLarge(self.0.to_string()))
    }

    pub fn as_ubig(&self) -> &UBig {
        &self.0
    }
}

impl Default for TileIndex {
    fn default() -> Self {
        TileIndex::zero()
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TileIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TileIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TileIndex::parse(&raw).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// Identity of one tile: level plus grid position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u32,
    pub x: TileIndex,
    pub y: TileIndex,
}

impl TileKey {
    pub fn new(level: u32, x: TileIndex, y: TileIndex) -> Self {
        Self { level, x, y }
    }

    /// Key string as used by the tile manifest: `level/x/y`.
    pub fn manifest_key(&self) -> String {
        format!("{}/{}/{}", self.level, self.x, self.y)
    }

    /// Parse a `level/x/y` manifest entry.
    pub fn parse_manifest_key(input: &str) -> CoreResult<Self> {
        let mut parts = input.split('/');
        let (Some(level), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::BadCoordinate {
                input: input.to_string(),
                reason: "expected level/x/y".to_string(),
            });
        };
        let level: u32 = level.parse().map_err(|e| CoreError::BadCoordinate {
            input: input.to_string(),
            reason: format!("{}", e),
        })?;
        Ok(Self::new(level, TileIndex::parse(x)?, TileIndex::parse(y)?))
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}
