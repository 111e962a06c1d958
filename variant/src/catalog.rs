//! The art assets each trend direction can display.

use serde::{Deserialize, Serialize};

use market::types::Direction;

use crate::types::{VariantError, VariantRef};

pub const DEFAULT_ASSET_BASE: &str = "https://ipfs.io/ipfs/bull-and-bear";

const DEFAULT_BULL_ASSETS: [&str; 3] = ["gamer_bull.json", "party_bull.json", "simple_bull.json"];
const DEFAULT_BEAR_ASSETS: [&str; 3] = ["beanie_bear.json", "coolio_bear.json", "simple_bear.json"];

/// Asset URIs grouped by direction. Both lists are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct VariantCatalog {
    bull: Vec<String>,
    bear: Vec<String>,
}

#[derive(Deserialize)]
struct RawCatalog {
    bull: Vec<String>,
    bear: Vec<String>,
}

impl TryFrom<RawCatalog> for VariantCatalog {
    type Error = VariantError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        VariantCatalog::new(raw.bull, raw.bear)
    }
}

impl VariantCatalog {
    pub fn new(bull: Vec<String>, bear: Vec<String>) -> Result<Self, VariantError> {
        if bull.is_empty() {
            return Err(VariantError::EmptyVariantSet(Direction::Bull));
        }
        if bear.is_empty() {
            return Err(VariantError::EmptyVariantSet(Direction::Bear));
        }

        Ok(Self { bull, bear })
    }

    /// Builds `<base>/<file>?filename=<file>` URIs for every asset file.
    pub fn from_files(base: &str, bull: &[&str], bear: &[&str]) -> Result<Self, VariantError> {
        let base = base.trim_end_matches('/');
        let uri = |file: &&str| format!("{}/{}?filename={}", base, file, file);

        Self::new(bull.iter().map(uri).collect(), bear.iter().map(uri).collect())
    }

    pub fn from_json(raw: &str) -> Result<Self, VariantError> {
        serde_json::from_str(raw).map_err(|e| VariantError::InvalidCatalog(e.to_string()))
    }

    pub fn assets(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Bull => &self.bull,
            Direction::Bear => &self.bear,
        }
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.assets(direction).len()
    }

    pub fn uri(&self, variant: &VariantRef) -> Option<&str> {
        self.assets(variant.direction)
            .get(variant.index)
            .map(String::as_str)
    }

    pub fn check(&self, variant: VariantRef) -> Result<VariantRef, VariantError> {
        match self.uri(&variant) {
            Some(_) => Ok(variant),
            None => Err(VariantError::UnknownVariant { variant }),
        }
    }
}

impl Default for VariantCatalog {
    fn default() -> Self {
        Self {
            bull: DEFAULT_BULL_ASSETS
                .iter()
                .map(|f| format!("{}/{}?filename={}", DEFAULT_ASSET_BASE, f, f))
                .collect(),
            bear: DEFAULT_BEAR_ASSETS
                .iter()
                .map(|f| format!("{}/{}?filename={}", DEFAULT_ASSET_BASE, f, f))
                .collect(),
        }
    }
}
