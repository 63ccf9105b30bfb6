// smartmark/src/presentation/session_view.rs
use crate::domain::user::User;
use crate::presentation::notice::{Notice, AUTH_ERROR};

/// Who the page is showing, as far as it knows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Unauthenticated,
    Authenticated(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Initial current-user lookup answered
    Resolved(Option<User>),
    /// Initial current-user lookup failed
    ResolveFailed,
    /// Auth-state stream notification
    Changed(Option<User>),
}

impl SessionState {
    /// Last writer wins. A failed lookup only settles a still-unresolved
    /// session; it never signs out a user already known.
    pub fn apply(&mut self, event: AuthEvent) -> Option<Notice> {
        match event {
            AuthEvent::Resolved(user) | AuthEvent::Changed(user) => {
                *self = Self::from_user(user);
                None
            }
            AuthEvent::ResolveFailed => {
                if *self == SessionState::Uninitialized {
                    *self = SessionState::Unauthenticated;
                }
                Some(Notice::error(AUTH_ERROR))
            }
        }
    }

    fn from_user(user: Option<User>) -> Self {
        match user {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        *self == SessionState::Uninitialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserId;

    fn jane() -> User {
        User::new(UserId::new("u1"), "jane@example.com")
    }

    #[test]
    fn given_unresolved_when_user_resolved_then_authenticated() {
        let mut state = SessionState::default();
        assert!(state.is_loading());
        assert_eq!(state.apply(AuthEvent::Resolved(Some(jane()))), None);
        assert_eq!(state.user(), Some(&jane()));
    }

    #[test]
    fn given_unresolved_when_lookup_fails_then_unauthenticated_with_notice() {
        let mut state = SessionState::default();
        let notice = state.apply(AuthEvent::ResolveFailed).unwrap();
        assert_eq!(notice.message, AUTH_ERROR);
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn given_authenticated_when_late_lookup_fails_then_user_kept() {
        let mut state = SessionState::Authenticated(jane());
        assert!(state.apply(AuthEvent::ResolveFailed).is_some());
        assert_eq!(state.user(), Some(&jane()));
    }

    #[test]
    fn given_authenticated_when_sign_out_notified_then_unauthenticated() {
        let mut state = SessionState::Authenticated(jane());
        state.apply(AuthEvent::Changed(None));
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn given_stale_resolution_after_notification_then_last_writer_wins() {
        let mut state = SessionState::default();
        state.apply(AuthEvent::Changed(Some(jane())));
        state.apply(AuthEvent::Resolved(None));
        assert_eq!(state, SessionState::Unauthenticated);
    }
}
