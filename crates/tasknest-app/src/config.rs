//! Project configuration loaded from `<data-dir>/config.toml`.

use std::{collections::HashSet, env, fs, path::Path};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tasknest_core::{Language, Theme, UserPreferences};

use crate::identity::MIN_PASSWORD_LEN;

const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `[image] cloud_name`.
pub const ENV_IMAGE_CLOUD_NAME: &str = "TASKNEST_IMAGE_CLOUD_NAME";
/// Environment variable overriding `[image] upload_preset`.
pub const ENV_IMAGE_UPLOAD_PRESET: &str = "TASKNEST_IMAGE_UPLOAD_PRESET";
/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "TASKNEST_DATA_DIR";
/// Environment variable holding the default sign-in email.
pub const ENV_USER: &str = "TASKNEST_USER";

/// Default image-host API root.
pub const DEFAULT_IMAGE_API_BASE: &str = "https://api.cloudinary.com/v1_1";
/// Largest accepted upload.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Reference categories seeded on first initialization.
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Travail",
    "Personnel",
    "Courses",
    "Santé",
    "Éducation",
    "Projet",
    "Urgence",
];

/// Top-level configuration loaded from `<data-dir>/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Image host settings.
    #[serde(default)]
    pub image: ImageConfig,
    /// Initialization seed data.
    #[serde(default)]
    pub seed: SeedConfig,
    /// Preferences shown while nobody is signed in.
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

impl ProjectConfig {
    /// Load configuration from the data directory, applying process environment overrides.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or fails validation.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let mut fetch = |key: &'static str| env::var(key).ok();
        let mut config = Self::from_workdir(data_dir)?;
        config.apply_env_with(&mut fetch);
        Ok(config)
    }

    /// Load configuration from a known data directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or fails validation.
    pub fn from_workdir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_with(&mut self, fetch: &mut impl FnMut(&'static str) -> Option<String>) {
        if let Some(value) = env_value_with(ENV_IMAGE_CLOUD_NAME, fetch) {
            self.image.cloud_name = Some(value);
        }
        if let Some(value) = env_value_with(ENV_IMAGE_UPLOAD_PRESET, fetch) {
            self.image.upload_preset = Some(value);
        }
    }

    fn validate(&self) -> Result<()> {
        self.image.validate()?;
        self.seed.validate()
    }
}

fn env_value_with(key: &'static str, fetch: &mut impl FnMut(&'static str) -> Option<String>) -> Option<String> {
    fetch(key).filter(|value| !value.trim().is_empty())
}

/// Default sign-in email taken from `TASKNEST_USER`, if set.
#[must_use]
pub fn user_from_env() -> Option<String> {
    let mut fetch = |key: &'static str| env::var(key).ok();
    env_value_with(ENV_USER, &mut fetch)
}

/// Image host block.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Account name on the image host.
    #[serde(default)]
    pub cloud_name: Option<String>,
    /// Unsigned upload preset.
    #[serde(default)]
    pub upload_preset: Option<String>,
    /// API root, without the account segment.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_api_base() -> String {
    DEFAULT_IMAGE_API_BASE.to_owned()
}

const fn default_max_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: None,
            api_base: default_api_base(),
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ImageConfig {
    /// Hosted uploads need both an account and a preset.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.cloud_name) && present(&self.upload_preset)
    }

    /// Upload endpoint for the configured account.
    #[must_use]
    pub fn upload_url(&self) -> Option<String> {
        let cloud_name = self.cloud_name.as_deref()?;
        Some(format!(
            "{}/{cloud_name}/image/upload",
            self.api_base.trim_end_matches('/')
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            bail!("image max_bytes must be positive");
        }
        if self.api_base.trim().is_empty() {
            bail!("image api_base must not be empty");
        }
        Ok(())
    }
}

/// Seed data written by the initialization flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Reference category names.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Whether the demo principal is provisioned.
    #[serde(default = "default_true")]
    pub demo_enabled: bool,
    /// Demo principal credentials.
    #[serde(default)]
    pub demo: DemoAccount,
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|name| (*name).to_owned()).collect()
}

const fn default_true() -> bool {
    true
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            demo_enabled: true,
            demo: DemoAccount::default(),
        }
    }
}

impl SeedConfig {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.categories {
            if name.trim().is_empty() {
                bail!("seed category names must not be empty");
            }
            if !seen.insert(name.as_str()) {
                bail!("duplicate seed category detected: {name}");
            }
        }
        if self.demo.email.trim().is_empty() {
            bail!("demo account email must not be empty");
        }
        if self.demo.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("demo account password must contain at least {MIN_PASSWORD_LEN} characters");
        }
        Ok(())
    }
}

/// Demo principal provisioned during initialization.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoAccount {
    /// Sign-in email.
    pub email: String,
    /// Sign-in password.
    pub password: String,
    /// Display name.
    pub display_name: String,
}

impl Default for DemoAccount {
    fn default() -> Self {
        Self {
            email: "demo@example.com".to_owned(),
            password: "Demo123!".to_owned(),
            display_name: "Utilisateur Démo".to_owned(),
        }
    }
}

/// `[preferences]` block.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferencesConfig {
    /// Theme used while signed out.
    #[serde(default)]
    pub theme: Theme,
    /// Language used while signed out.
    #[serde(default)]
    pub language: Language,
}

impl PreferencesConfig {
    /// Full preference set with the configured theme and language.
    #[must_use]
    pub fn to_preferences(self) -> UserPreferences {
        UserPreferences {
            theme: self.theme,
            language: self.language,
            ..UserPreferences::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, contents: &str) -> Result<()> {
        let mut file = fs::File::create(dir.join(CONFIG_FILE))?;
        writeln!(file, "{contents}")?;
        Ok(())
    }

    #[test]
    fn missing_config_returns_defaults() -> Result<()> {
        let dir = tempdir()?;
        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert!(!cfg.image.is_configured());
        assert_eq!(cfg.image.max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.seed.categories.len(), 7);
        assert!(cfg.seed.demo_enabled);
        assert_eq!(cfg.seed.demo.email, "demo@example.com");
        assert_eq!(cfg.preferences.language, Language::Fr);
        Ok(())
    }

    #[test]
    fn load_image_and_preferences() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            "[image]\ncloud_name = \"acme\"\nupload_preset = \"unsigned\"\n\n[preferences]\ntheme = \"dark\"\nlanguage = \"en\"",
        )?;

        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert!(cfg.image.is_configured());
        assert_eq!(
            cfg.image.upload_url().as_deref(),
            Some("https://api.cloudinary.com/v1_1/acme/image/upload")
        );
        let prefs = cfg.preferences.to_preferences();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, Language::En);
        assert!(prefs.show_completed_tasks);
        Ok(())
    }

    #[test]
    fn duplicate_categories_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[seed]\ncategories = [\"Travail\", \"Travail\"]")?;

        let Err(err) = ProjectConfig::from_workdir(dir.path()) else {
            panic!("duplicate category should error");
        };
        assert!(err.to_string().contains("duplicate seed category"));
        Ok(())
    }

    #[test]
    fn short_demo_password_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            "[seed.demo]\nemail = \"d@example.com\"\npassword = \"abc\"\ndisplay_name = \"D\"",
        )?;

        let Err(err) = ProjectConfig::from_workdir(dir.path()) else {
            panic!("short demo password should error");
        };
        assert!(err.to_string().contains("at least 6 characters"));
        Ok(())
    }

    #[test]
    fn environment_overrides_image_settings() {
        let mut cfg = ProjectConfig::default();
        let mut fetch = |key: &'static str| match key {
            ENV_IMAGE_CLOUD_NAME => Some("env-cloud".into()),
            ENV_IMAGE_UPLOAD_PRESET => Some("  ".into()),
            _ => None,
        };
        cfg.apply_env_with(&mut fetch);
        assert_eq!(cfg.image.cloud_name.as_deref(), Some("env-cloud"));
        assert!(cfg.image.upload_preset.is_none());
        assert!(!cfg.image.is_configured());
    }
}
