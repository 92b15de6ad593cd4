//! Layered configuration loading.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `disunity.toml` (or `disunity.yaml` / `disunity.yml`), then its
//!    profile overlay `disunity.{profile}.toml`
//! 3. Application secrets from flat variables: `DISUNITY_PUBLIC_KEY`,
//!    `DISUNITY_CLIENT_ID`, `DISUNITY_CLIENT_SECRET`, `DISUNITY_BOT_TOKEN`
//! 4. Sectioned variables such as `DISUNITY_APPLICATION__BOT_TOKEN` or
//!    `DISUNITY_SERVER__PORT`, `__` separating section and key
//! 5. Programmatic overrides
//!
//! The profile comes from [`ConfigLoader::profile`] or `DISUNITY_PROFILE`.
//! Without explicit search paths, the current directory and the user config
//! directory (`~/.config/disunity` on Linux) are searched in that order; the
//! first directory holding a main file is used.
//!
//! ```rust,ignore
//! use disunity_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/disunity.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::DisunityConfig;

const ENV_PREFIX: &str = "DISUNITY_";
const PROFILE_VAR: &str = "DISUNITY_PROFILE";
const FILE_STEM: &str = "disunity";

/// A configuration file format enabled at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Extensions searched for, in order.
    const EXTENSIONS: &'static [&'static str] = &[
        #[cfg(feature = "toml-config")]
        "toml",
        #[cfg(feature = "yaml-config")]
        "yaml",
        #[cfg(feature = "yaml-config")]
        "yml",
    ];

    fn of(path: &Path) -> ConfigResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(ConfigError::ParseError(format!(
                "unsupported or disabled configuration format: .{ext}"
            ))),
        }
    }

    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Maps the flat secret variables onto the `application` section.
fn secrets_env() -> Env {
    Env::prefixed(ENV_PREFIX).filter_map(|key| {
        let field = match key.as_str().to_ascii_lowercase().as_str() {
            "public_key" => "public_key",
            "client_id" | "application_id" => "application_id",
            "client_secret" => "client_secret",
            "bot_token" => "bot_token",
            _ => return None,
        };
        Some(format!("application.{field}").into())
    })
}

/// Sectioned variables. Flat ones are left to [`secrets_env`].
fn sectioned_env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .filter(|key| key.as_str().contains("__"))
        .split("__")
}

/// Loads [`DisunityConfig`] from files, the environment and overrides.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader. The profile defaults to `DISUNITY_PROFILE`.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: std::env::var(PROFILE_VAR).ok().filter(|p| !p.is_empty()),
            search_paths: Vec::new(),
            file: None,
            use_env: true,
        }
    }

    /// Sets the profile whose overlay file is merged over the main file.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a directory to search for `disunity.*`. Replaces the default
    /// search paths.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `DISUNITY_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Merges configuration over every other source.
    pub fn merge(mut self, config: DisunityConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads the configuration. It is not validated.
    pub fn load(self) -> ConfigResult<DisunityConfig> {
        let mut figment = Figment::from(Serialized::defaults(DisunityConfig::default()));

        match self.main_file()? {
            Some(path) => figment = self.merge_file(figment, &path)?,
            None => warn!(
                paths = ?self.directories(),
                "No configuration file found, using defaults"
            ),
        }

        if self.use_env {
            figment = figment.merge(secrets_env()).merge(sectioned_env());
        }

        let config: DisunityConfig = figment.merge(self.overrides).extract()?;
        debug!(
            profile = self.profile.as_deref().unwrap_or("none"),
            application_id = config.application.application_id.as_deref().unwrap_or("unset"),
            bot_token = config.application.bot_token.is_some(),
            port = config.server.port,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Returns the explicit file, or the first main file found.
    fn main_file(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            return Ok(Some(path.clone()));
        }

        Ok(self.directories().into_iter().find_map(|dir| {
            FileFormat::EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{FILE_STEM}.{ext}")))
                .find(|path| path.exists())
        }))
    }

    fn directories(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
            .collect()
    }

    /// Merges `path`, then its `{stem}.{profile}.{ext}` sibling if present.
    fn merge_file(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let format = FileFormat::of(path)?;
        info!(path = %path.display(), "Loading configuration file");
        let mut figment = format.merge(figment, path);

        if let Some(overlay) = self.profile_overlay(path).filter(|p| p.exists()) {
            debug!(path = %overlay.display(), "Loading profile overlay");
            figment = format.merge(figment, &overlay);
        }
        Ok(figment)
    }

    fn profile_overlay(&self, path: &Path) -> Option<PathBuf> {
        let profile = self.profile.as_deref()?;
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
    }
}
