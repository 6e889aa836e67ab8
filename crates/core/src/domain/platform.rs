use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Sales platforms the reseller lists on.
///
/// Declaration order is the canonical iteration order: every per-platform map
/// in the crate is a `BTreeMap<Platform, _>` and reports platforms in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Reliance,
    Pai,
    Croma,
    Flipkart,
}

impl Platform {
    pub const ALL: [Platform; 4] =
        [Platform::Reliance, Platform::Pai, Platform::Croma, Platform::Flipkart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reliance => "reliance",
            Self::Pai => "pai",
            Self::Croma => "croma",
            Self::Flipkart => "flipkart",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Reliance => "Reliance",
            Self::Pai => "Pai",
            Self::Croma => "Croma",
            Self::Flipkart => "Flipkart",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reliance" => Some(Self::Reliance),
            "pai" => Some(Self::Pai),
            "croma" => Some(Self::Croma),
            "flipkart" => Some(Self::Flipkart),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| DomainError::UnknownPlatform(value.trim().to_string()))
    }
}
