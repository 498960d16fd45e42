//! Viewer configuration.

use std::path::Path;

use fbview_core::RenderConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window and frame buffer size.
    pub display: DisplayConfig,
    /// Render engine selection.
    pub render: RenderConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Frame buffer width; also the initial window width.
    pub width: u32,
    /// Frame buffer height; also the initial window height.
    pub height: u32,
    /// Stretch the frame buffer over the whole client area instead of
    /// presenting it 1:1.
    pub scale_to_window: bool,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            scale_to_window: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use fbview_core::RenderMode;

    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ViewerConfig::default()).unwrap();
        assert!(text.contains("preferred_mode = \"software\""));
        assert!(text.contains("width"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ViewerConfig::default()).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.display.width, 1024);
        assert_eq!(parsed.render.preferred_mode, RenderMode::Software);
        assert!(parsed.render.preserve_contents);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let text = "[render]\npreferred_mode = \"hardware\"\n";
        let parsed: ViewerConfig = toml::from_str(text).unwrap();
        assert_eq!(parsed.render.preferred_mode, RenderMode::Hardware);
        assert_eq!(parsed.display.height, 768);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn written_default_loads_back() {
        let path = std::env::temp_dir().join(format!("fbview-gui-{}.toml", std::process::id()));
        ViewerConfig::write_default(&path).unwrap();
        let cfg = ViewerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.display.width, 1024);
        assert!(cfg.display.scale_to_window);
        assert_eq!(cfg.render.preferred_mode, RenderMode::Software);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ViewerConfig::load(Path::new("/nonexistent/fbview-gui.toml"));
        assert_eq!(cfg.display.width, 1024);
    }
}
