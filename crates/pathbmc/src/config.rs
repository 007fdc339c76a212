//! Engine configuration.

use pathbmc_ai::AnalysisParams;
use pathbmc_smt::MucMethod;
use serde::{Deserialize, Serialize};

/// Configuration for a path-based solving run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run the abstract-interpretation refiner on each candidate path
    /// before paying for the precise SMT check.
    pub path_ai: bool,

    /// Core-extraction strategy used by the SMT refiner.
    pub muc: MucMethod,

    /// Parameters handed to the path analyzer when `path_ai` is on.
    pub analysis: AnalysisParams,
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    path_ai: Option<bool>,
    muc: Option<MucMethod>,
    analysis: Option<AnalysisParams>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_ai(mut self, value: bool) -> Self {
        self.path_ai = Some(value);
        self
    }

    pub fn muc(mut self, value: MucMethod) -> Self {
        self.muc = Some(value);
        self
    }

    pub fn analysis(mut self, value: AnalysisParams) -> Self {
        self.analysis = Some(value);
        self
    }

    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            path_ai: self.path_ai.unwrap_or(defaults.path_ai),
            muc: self.muc.unwrap_or(defaults.muc),
            analysis: self.analysis.unwrap_or(defaults.analysis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(!config.path_ai);
        assert_eq!(config.muc, MucMethod::Assumptions);
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfigBuilder::new()
            .path_ai(true)
            .muc(MucMethod::BinarySearch)
            .build();
        assert!(config.path_ai);
        assert_eq!(config.muc, MucMethod::BinarySearch);
    }
}
