use crate::id::UserId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Principal recorded when nobody was signed in during initialization.
pub const SYSTEM_INITIALIZER: &str = "system";

/// Singleton record marking that one-time seeding has happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateRecord {
    /// Whether initialization completed.
    pub initialized: bool,
    /// When the gate was written.
    #[serde(with = "time::serde::rfc3339")]
    pub initialized_at: OffsetDateTime,
    /// Principal id of the initializer, or [`SYSTEM_INITIALIZER`].
    pub initialized_by: String,
}

impl GateRecord {
    /// Record written by the initialization action.
    #[must_use]
    pub fn written_by(initializer: Option<&UserId>, now: OffsetDateTime) -> Self {
        Self {
            initialized: true,
            initialized_at: now,
            initialized_by: initializer.map_or_else(|| SYSTEM_INITIALIZER.to_owned(), ToString::to_string),
        }
    }
}

/// Gate state as observed by the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    /// The gate record has not been read yet.
    #[default]
    Unknown,
    /// Seeding has not happened.
    Uninitialized,
    /// Seeding has happened.
    Initialized,
}

impl InitState {
    /// State after reading the gate record. A failed read counts as uninitialized.
    #[must_use]
    pub fn from_read<E>(read: Result<Option<&GateRecord>, E>) -> Self {
        match read {
            Ok(Some(record)) if record.initialized => Self::Initialized,
            Ok(_) | Err(_) => Self::Uninitialized,
        }
    }

    /// State after the initialization action wrote the gate.
    ///
    /// Only `Uninitialized` moves forward; the other states are returned unchanged.
    #[must_use]
    pub const fn after_initialize(self) -> Self {
        match self {
            Self::Uninitialized => Self::Initialized,
            other => other,
        }
    }

    /// Resolve where a navigation request should land.
    #[must_use]
    pub const fn guard(self, route: Route) -> RouteDecision {
        match (self, route) {
            (Self::Unknown, _) => RouteDecision::Loading,
            (Self::Uninitialized, Route::Initialize) => RouteDecision::Render(route),
            (Self::Uninitialized, _) => RouteDecision::Redirect(Route::Initialize),
            (Self::Initialized, Route::Initialize) => RouteDecision::Redirect(Route::Login),
            (Self::Initialized, Route::Other) => RouteDecision::Redirect(Route::Home),
            (Self::Initialized, _) => RouteDecision::Render(route),
        }
    }
}

/// Navigable destinations of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// One-time initialization screen.
    Initialize,
    /// Task list.
    Home,
    /// Sign-in.
    Login,
    /// Account creation.
    Register,
    /// Profile and preferences.
    Profile,
    /// Any unrecognised path.
    Other,
}

/// Outcome of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Gate not read yet; show a loading indicator.
    Loading,
    /// Show the requested route.
    Render(Route),
    /// Navigate elsewhere instead.
    Redirect(Route),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(initialized: bool) -> GateRecord {
        GateRecord {
            initialized,
            initialized_at: datetime!(2025-01-01 0:00 UTC),
            initialized_by: SYSTEM_INITIALIZER.into(),
        }
    }

    #[test]
    fn read_outcomes_map_to_states() {
        let done = record(true);
        let pending = record(false);
        assert_eq!(InitState::from_read::<()>(Ok(Some(&done))), InitState::Initialized);
        assert_eq!(InitState::from_read::<()>(Ok(Some(&pending))), InitState::Uninitialized);
        assert_eq!(InitState::from_read::<()>(Ok(None)), InitState::Uninitialized);
        assert_eq!(InitState::from_read(Err("offline")), InitState::Uninitialized);
    }

    #[test]
    fn only_uninitialized_advances() {
        assert_eq!(InitState::Uninitialized.after_initialize(), InitState::Initialized);
        assert_eq!(InitState::Unknown.after_initialize(), InitState::Unknown);
        assert_eq!(InitState::Initialized.after_initialize(), InitState::Initialized);
    }

    #[test]
    fn uninitialized_redirects_everything_to_initialize() {
        let state = InitState::Uninitialized;
        assert_eq!(state.guard(Route::Initialize), RouteDecision::Render(Route::Initialize));
        for route in [Route::Home, Route::Login, Route::Register, Route::Profile, Route::Other] {
            assert_eq!(state.guard(route), RouteDecision::Redirect(Route::Initialize));
        }
    }

    #[test]
    fn initialized_keeps_users_away_from_initialize() {
        let state = InitState::Initialized;
        assert_eq!(state.guard(Route::Initialize), RouteDecision::Redirect(Route::Login));
        assert_eq!(state.guard(Route::Other), RouteDecision::Redirect(Route::Home));
        assert_eq!(state.guard(Route::Profile), RouteDecision::Render(Route::Profile));
    }

    #[test]
    fn unknown_state_shows_loading() {
        assert_eq!(InitState::Unknown.guard(Route::Home), RouteDecision::Loading);
    }

    #[test]
    fn gate_record_names_initializer() {
        let now = datetime!(2025-01-01 0:00 UTC);
        assert_eq!(GateRecord::written_by(None, now).initialized_by, "system");
        let uid = UserId::new("u-7");
        assert_eq!(GateRecord::written_by(Some(&uid), now).initialized_by, "u-7");
    }
}
