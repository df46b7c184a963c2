//! Drive models and per-feature minimum firmware versions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gemini drive model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveModel {
    /// Gemini GT stepper drive
    Gt,
    /// Gemini GV servo drive
    Gv,
    /// Gemini GT6 stepper drive/controller
    Gt6,
    /// Gemini GV6 servo drive/controller
    Gv6,
}

impl DriveModel {
    /// Model name as printed by the drive
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveModel::Gt => "GT",
            DriveModel::Gv => "GV",
            DriveModel::Gt6 => "GT6",
            DriveModel::Gv6 => "GV6",
        }
    }
}

impl fmt::Display for DriveModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveModel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GT" => Ok(DriveModel::Gt),
            "GV" => Ok(DriveModel::Gv),
            "GT6" => Ok(DriveModel::Gt6),
            "GV6" => Ok(DriveModel::Gv6),
            _ => Err(()),
        }
    }
}

/// Minimum firmware version per drive model for one feature
///
/// `None` means the model doesn't have the feature at all. Versions are the
/// drive firmware revision times 100 (`D1.50` is 150).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeminiVersions {
    /// GT minimum
    pub gt: Option<u32>,
    /// GV minimum
    pub gv: Option<u32>,
    /// GT6 minimum
    pub gt6: Option<u32>,
    /// GV6 minimum
    pub gv6: Option<u32>,
}

impl GeminiVersions {
    /// Table from the per-model minimums
    pub const fn new(gt: Option<u32>, gv: Option<u32>, gt6: Option<u32>, gv6: Option<u32>) -> Self {
        Self { gt, gv, gt6, gv6 }
    }

    /// Minimum version for `model`, if it has the feature
    pub fn minimum_for(&self, model: DriveModel) -> Option<u32> {
        match model {
            DriveModel::Gt => self.gt,
            DriveModel::Gv => self.gv,
            DriveModel::Gt6 => self.gt6,
            DriveModel::Gv6 => self.gv6,
        }
    }

    /// Whether firmware `version` of `model` has the feature
    pub fn supports(&self, model: DriveModel, version: u32) -> bool {
        self.minimum_for(model).is_some_and(|minimum| version >= minimum)
    }
}
