use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a list is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Card in the grid
    Compact,
    /// Overlay, editable
    Medium,
    /// Overlay, editable, with the generation panel
    Large,
}

impl ViewMode {
    /// Cycle compact → medium → large → compact
    pub fn next(self) -> ViewMode {
        match self {
            ViewMode::Compact => ViewMode::Medium,
            ViewMode::Medium => ViewMode::Large,
            ViewMode::Large => ViewMode::Compact,
        }
    }

    /// The overlay mode, or `None` for compact
    pub fn overlay(self) -> Option<OverlayMode> {
        match self {
            ViewMode::Compact => None,
            ViewMode::Medium => Some(OverlayMode::Medium),
            ViewMode::Large => Some(OverlayMode::Large),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Compact => "compact",
            ViewMode::Medium => "medium",
            ViewMode::Large => "large",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(ViewMode::Compact),
            "medium" => Ok(ViewMode::Medium),
            "large" => Ok(ViewMode::Large),
            other => Err(format!(
                "unknown view mode '{}' (expected: compact, medium, large)",
                other
            )),
        }
    }
}

/// The two modes a list can be expanded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Medium,
    Large,
}

impl From<OverlayMode> for ViewMode {
    fn from(mode: OverlayMode) -> Self {
        match mode {
            OverlayMode::Medium => ViewMode::Medium,
            OverlayMode::Large => ViewMode::Large,
        }
    }
}

/// The one list currently rendered as an overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
    pub list_id: String,
    pub mode: OverlayMode,
}
