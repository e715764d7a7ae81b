//! Application configuration: TOML file in the user config directory.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::charts::ChartToggles;

/// Manages the config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Loads the config file, falling back to defaults when absent.
    pub fn load(&self) -> Result<AppConfig> {
        let path = self.config_file();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        std::fs::write(self.config_file(), toml::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Default configuration template with every field commented out, so
    /// defaults apply until a line is uncommented.
    pub fn generate_default_config(&self) -> Result<String> {
        let serialized = toml::to_string_pretty(&AppConfig::default())?;
        let mut out = String::from("# ankieta configuration\n# Uncomment a line to override the default.\n\n");
        for line in serialized.lines() {
            if line.is_empty() || line.starts_with('[') {
                out.push_str(line);
            } else {
                out.push_str("# ");
                out.push_str(line);
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Writes the commented template unless a config file already exists.
    pub fn write_default_config(&self) -> Result<PathBuf> {
        let path = self.config_file();
        if path.exists() {
            return Err(eyre!("config file already exists: {}", path.display()));
        }
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        std::fs::write(&path, self.generate_default_config()?)?;
        Ok(path)
    }
}

/// Settings with report and chart defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rows shown in the report preview table.
    pub preview_rows: usize,
    /// Histogram bin count.
    pub histogram_bins: usize,
    /// PNG logo embedded into HTML report chrome.
    pub logo: Option<PathBuf>,
    /// Chart kinds enabled by default.
    pub charts: ChartDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview_rows: 10,
            histogram_bins: 20,
            logo: None,
            charts: ChartDefaults::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDefaults {
    pub histogram: bool,
    pub scatter: bool,
    pub correlation: bool,
    pub box_plot: bool,
    pub violin: bool,
    pub count: bool,
    pub matrix: bool,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            histogram: true,
            scatter: true,
            correlation: true,
            box_plot: false,
            violin: false,
            count: false,
            matrix: false,
        }
    }
}

impl ChartDefaults {
    pub fn to_toggles(&self) -> ChartToggles {
        ChartToggles {
            histogram: self.histogram,
            scatter: self.scatter,
            correlation: self.correlation,
            box_plot: self.box_plot,
            violin: self.violin,
            count: self.count,
            matrix: self.matrix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        let config = manager.load().unwrap();
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.histogram_bins, 20);
        assert!(config.charts.histogram);
        assert!(!config.charts.violin);
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().join("ankieta"));
        let mut config = AppConfig::default();
        config.preview_rows = 25;
        config.charts.violin = true;
        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(loaded.preview_rows, 25);
        assert!(loaded.charts.violin);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(manager.config_file(), "preview_rows = 5\n").unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.histogram_bins, 20);
    }

    #[test]
    fn default_template_is_commented() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        let template = manager.generate_default_config().unwrap();
        assert!(template.contains("# preview_rows"));
        assert!(template.contains("[charts]"));
    }
}
