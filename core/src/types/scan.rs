use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    #[default]
    SinglePage,
    MultiPage,
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanType::SinglePage => write!(f, "single_page"),
            ScanType::MultiPage => write!(f, "multi_page"),
        }
    }
}

impl FromStr for ScanType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_page" | "single" => Ok(ScanType::SinglePage),
            "multi_page" | "multi" => Ok(ScanType::MultiPage),
            other => Err(ScanError::InvalidInput {
                message: format!(
                    "unknown scan type '{}', expected single_page or multi_page",
                    other
                ),
            }),
        }
    }
}

/// Customer tier forwarded to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Starter,
    Professional,
    Enterprise,
}

impl Tier {
    /// Lenient parse used for values echoed back by the scanner.
    ///
    /// Unknown tiers fall back to `Starter`, with a warning so the contract
    /// drift stays visible in the logs.
    pub fn from_remote(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(tier = raw, "scanner echoed an unknown tier, treating as starter");
            Tier::Starter
        })
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Starter => write!(f, "starter"),
            Tier::Professional => write!(f, "professional"),
            Tier::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for Tier {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starter" => Ok(Tier::Starter),
            "professional" | "pro" => Ok(Tier::Professional),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(ScanError::InvalidInput {
                message: format!("unknown tier '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_level: Option<String>,
    #[serde(default)]
    pub include_warnings: bool,
}

/// Everything the caller supplies to start a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub url: String,
    pub scan_type: ScanType,
    pub tier: Tier,
    pub options: ScanOptions,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scan_type: ScanType::default(),
            tier: Tier::default(),
            options: ScanOptions::default(),
        }
    }

    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }
}
