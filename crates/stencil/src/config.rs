//! Configuration file structure (stencil.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use stencil_static::BuildConfig;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub serve: ServeSettings,
}

/// Directory layout of the site.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub pages: PathBuf,
    pub partials: PathBuf,
    pub assets: PathBuf,
    pub output: PathBuf,
    pub data: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let defaults = BuildConfig::default();
        Self {
            pages: defaults.pages_dir,
            partials: defaults.partials_dir,
            assets: defaults.assets_dir,
            output: defaults.output_dir,
            data: defaults.data_file,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    pub extensions: Vec<String>,
    pub strict_undefined: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        let defaults = BuildConfig::default();
        Self {
            extensions: defaults.extensions,
            strict_undefined: defaults.strict_undefined,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeSettings {
    pub addr: String,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            addr: ":80".to_string(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Pipeline configuration, with an optional output directory override.
    pub fn build_config(&self, output: Option<PathBuf>) -> BuildConfig {
        BuildConfig {
            pages_dir: self.site.pages.clone(),
            partials_dir: self.site.partials.clone(),
            assets_dir: self.site.assets.clone(),
            output_dir: output.unwrap_or_else(|| self.site.output.clone()),
            data_file: self.site.data.clone(),
            extensions: self.build.extensions.clone(),
            strict_undefined: self.build.strict_undefined,
        }
    }
}
