//! Render configuration.

use serde::{Deserialize, Serialize};

use crate::engine::RenderMode;

/// How the display surface builds and switches render engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Engine to try first. Hardware silently degrades to software when
    /// the probe says Direct2D is missing.
    pub preferred_mode: RenderMode,
    /// Copy the pixels of the outgoing engine into the incoming one on a
    /// mode switch.
    pub preserve_contents: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preferred_mode: RenderMode::Software,
            preserve_contents: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_favour_compatibility() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.preferred_mode, RenderMode::Software);
        assert!(cfg.preserve_contents);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: RenderConfig = toml::from_str("preferred_mode = \"hardware\"").unwrap();
        assert_eq!(cfg.preferred_mode, RenderMode::Hardware);
        assert!(cfg.preserve_contents);
    }
}
