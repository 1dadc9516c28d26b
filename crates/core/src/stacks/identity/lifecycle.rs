//! End-user registration lifecycle enforced by the user directory.
//!
//! `Unregistered -> PendingVerification -> Verified`. The directory runs
//! this itself; the model here pins down the rules the directory descriptor
//! is configured to enforce.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("user is already registered")]
    AlreadyRegistered,
    #[error("user has no pending verification")]
    NotPending,
    #[error("verification code does not match")]
    CodeMismatch,
    #[error("attribute '{0}' cannot be changed after registration")]
    ImmutableAttribute(&'static str),
}

/// Where a single end-user identity stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState {
    Unregistered,
    PendingVerification { email: String, code: String },
    Verified { email: String },
}

/// Things that can happen to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Self-registration. `code` is the one-time code delivered out of band.
    SignUp { email: String, code: String },
    ConfirmCode { code: String },
    ChangeEmail { email: String },
}

impl UserState {
    pub fn email(&self) -> Option<&str> {
        match self {
            UserState::Unregistered => None,
            UserState::PendingVerification { email, .. } | UserState::Verified { email } => {
                Some(email)
            }
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, UserState::Verified { .. })
    }
}

/// Applies `event` to `state`. Invalid transitions leave the caller's state untouched.
pub fn transition(state: &UserState, event: LifecycleEvent) -> Result<UserState, LifecycleError> {
    match (state, event) {
        (UserState::Unregistered, LifecycleEvent::SignUp { email, code }) => {
            validate_email(&email)?;
            Ok(UserState::PendingVerification { email, code })
        }
        (_, LifecycleEvent::SignUp { .. }) => Err(LifecycleError::AlreadyRegistered),

        (UserState::PendingVerification { email, code }, LifecycleEvent::ConfirmCode { code: given }) => {
            if *code != given {
                return Err(LifecycleError::CodeMismatch);
            }
            Ok(UserState::Verified {
                email: email.clone(),
            })
        }
        (_, LifecycleEvent::ConfirmCode { .. }) => Err(LifecycleError::NotPending),

        (UserState::Unregistered, LifecycleEvent::ChangeEmail { .. }) => {
            Err(LifecycleError::NotPending)
        }
        (_, LifecycleEvent::ChangeEmail { .. }) => Err(LifecycleError::ImmutableAttribute("email")),
    }
}

fn validate_email(email: &str) -> Result<(), LifecycleError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(LifecycleError::InvalidEmail(email.to_string()))
    }
}
