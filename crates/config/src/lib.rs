//! Configuration for jwlmerge.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults;
//! 2. `config.toml` in the user's config directory, if present;
//! 3. a file given with `--config` (which must exist);
//! 4. `JWLMERGE_*` environment variables (`JWLMERGE_OUTPUT_NAME`, ...).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use jwlmerge_merge::BrokenReferencePolicy;
use jwlmerge_package::ARCHIVE_EXTENSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "JWLMERGE_";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_OUTPUT_NAME: &str = "merged.jwlibrary";
const DEFAULT_OUTPUT_DIR: &str = "merged";
const FALLBACK_DEVICE_NAME: &str = "jwlmerge";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the merged archive is written. Defaults to `merged/` next to
    /// the executable.
    pub output_dir: Option<PathBuf>,
    pub output_name: String,
    /// Extension (without the dot) of the archives picked up from a folder.
    pub archive_extension: String,
    /// Device name recorded in the manifest.
    pub device_name: Option<String>,
    /// Database to start the merge from instead of an empty one.
    pub template_database: Option<PathBuf>,
    pub broken_references: BrokenReferencePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            archive_extension: ARCHIVE_EXTENSION.to_string(),
            device_name: None,
            template_database: None,
            broken_references: BrokenReferencePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(Self::user_config_path().as_deref(), explicit)?)
    }

    /// `config.toml` in the platform config directory.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "jwlmerge").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    fn figment(user: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = user.filter(|path| path.is_file()) {
            tracing::debug!(path = %user.display(), "Loading user configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(explicit) = explicit {
            if !explicit.is_file() {
                exn::bail!(ErrorKind::NotFound(explicit.to_path_buf()));
            }
            figment = figment.merge(Toml::file(explicit));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.archive_extension = config.archive_extension.trim_start_matches('.').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.output_name.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("output_name must not be empty".to_string()));
        }
        if self.output_name.contains(['/', '\\']) {
            exn::bail!(ErrorKind::Invalid(format!("output_name must be a file name, got {}", self.output_name)));
        }
        if self.archive_extension.is_empty() {
            exn::bail!(ErrorKind::Invalid("archive_extension must not be empty".to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Resolved values
    // =========================================================================

    /// Directory the merged archive goes into.
    pub fn output_dir(&self, base: &Path) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| base.join(DEFAULT_OUTPUT_DIR))
    }

    /// Full path of the merged archive.
    pub fn output_path(&self, base: &Path) -> PathBuf {
        self.output_dir(base).join(&self.output_name)
    }

    /// The configured device name, else the host name from the environment.
    pub fn device_name(&self) -> String {
        self.device_name
            .clone()
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_DEVICE_NAME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(jail: &Jail, user: Option<&str>, explicit: Option<&str>) -> Result<Config> {
        let user = user.map(|name| jail.directory().join(name));
        let explicit = explicit.map(|name| jail.directory().join(name));
        Config::from_figment(Config::figment(user.as_deref(), explicit.as_deref())?)
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            let config = load(jail, None, None).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.output_path(Path::new("/opt/jwlmerge")), PathBuf::from("/opt/jwlmerge/merged/merged.jwlibrary"));
            Ok(())
        });
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file("user.toml", "output_name = \"user.jwlibrary\"\ndevice_name = \"tablet\"")?;
            jail.create_file("explicit.toml", "output_name = \"explicit.jwlibrary\"\nbroken_references = \"fail\"")?;
            let config = load(jail, Some("user.toml"), Some("explicit.toml")).unwrap();
            assert_eq!(config.output_name, "explicit.jwlibrary");
            assert_eq!(config.device_name(), "tablet");
            assert_eq!(config.broken_references, BrokenReferencePolicy::Fail);

            jail.set_env("JWLMERGE_OUTPUT_NAME", "env.jwlibrary");
            let config = load(jail, Some("user.toml"), Some("explicit.toml")).unwrap();
            assert_eq!(config.output_name, "env.jwlibrary");
            Ok(())
        });
    }

    #[test]
    fn test_missing_user_config_is_ignored() {
        Jail::expect_with(|jail| {
            let config = load(jail, Some("absent.toml"), None).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        Jail::expect_with(|jail| {
            let err = load(jail, None, Some("absent.toml")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case("output_name = \"\"")]
    #[case("output_name = \"out/merged.jwlibrary\"")]
    #[case("archive_extension = \".\"")]
    #[case("broken_references = \"ignore\"")]
    fn test_invalid(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", contents)?;
            assert!(load(jail, None, Some("config.toml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_extension_dot_is_stripped() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "archive_extension = \".JWLibrary\"")?;
            let config = load(jail, None, Some("config.toml")).unwrap();
            assert_eq!(config.archive_extension, "JWLibrary");
            Ok(())
        });
    }
}
