use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl Severity {
    /// Maps a scanner impact/type label onto the dashboard scale.
    ///
    /// Returns `None` for labels outside the known vocabulary.
    pub fn from_impact(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "serious" | "error" => Some(Severity::Serious),
            "moderate" | "warning" => Some(Severity::Moderate),
            "minor" | "notice" => Some(Severity::Minor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Serious => write!(f, "serious"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIssue {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub selector: Option<String>,
    pub context: Option<String>,
    pub cross_validated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_and_type_labels() {
        assert_eq!(Severity::from_impact("Critical"), Some(Severity::Critical));
        assert_eq!(Severity::from_impact("error"), Some(Severity::Serious));
        assert_eq!(Severity::from_impact(" warning "), Some(Severity::Moderate));
        assert_eq!(Severity::from_impact("notice"), Some(Severity::Minor));
        assert_eq!(Severity::from_impact("cosmic"), None);
    }
}
