use crate::id::UserId;
use crate::task::Priority;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

/// Display theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Interface language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// French.
    #[default]
    Fr,
    /// English.
    En,
}

impl Language {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
        }
    }
}

/// Error returned when a preference token is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {token}")]
pub struct UnknownPreference {
    /// Which preference was being parsed.
    pub kind: &'static str,
    /// Offending input.
    pub token: String,
}

impl FromStr for Theme {
    type Err = UnknownPreference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(UnknownPreference {
                kind: "theme",
                token: s.to_owned(),
            }),
        }
    }
}

impl FromStr for Language {
    type Err = UnknownPreference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "en" => Ok(Self::En),
            _ => Err(UnknownPreference {
                kind: "language",
                token: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Display theme.
    #[serde(default)]
    pub theme: Theme,
    /// Interface language.
    #[serde(default)]
    pub language: Language,
    /// Whether completed tasks are listed.
    #[serde(default = "default_true")]
    pub show_completed_tasks: bool,
    /// Priority preselected for new tasks.
    #[serde(default)]
    pub default_priority: Priority,
}

const fn default_true() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: Language::Fr,
            show_completed_tasks: true,
            default_priority: Priority::Medium,
        }
    }
}

/// Authenticated principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable principal id.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional avatar URL.
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Profile document kept alongside the identity provider's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Principal id.
    pub uid: UserId,
    /// Sign-in email.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional avatar URL.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Account creation.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Most recent sign-in.
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    /// Display preferences.
    #[serde(default)]
    pub preferences: UserPreferences,
}

impl UserProfile {
    /// Fresh profile for a principal with default preferences.
    #[must_use]
    pub fn for_principal(principal: &Principal, now: OffsetDateTime) -> Self {
        Self {
            uid: principal.id.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
            photo_url: principal.photo_url.clone(),
            created_at: now,
            last_login: now,
            preferences: UserPreferences::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new_accounts() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, Language::Fr);
        assert!(prefs.show_completed_tasks);
        assert_eq!(prefs.default_priority, Priority::Medium);
    }

    #[test]
    fn missing_preference_fields_fall_back_to_defaults() {
        let prefs: UserPreferences = serde_json::from_str(r#"{"theme":"dark"}"#)
            .unwrap_or_else(|err| panic!("partial preferences must parse: {err}"));
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, Language::Fr);
        assert!(prefs.show_completed_tasks);
    }

    #[test]
    fn theme_toggles_and_tokens_parse() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert!("de".parse::<Language>().is_err());
    }
}
