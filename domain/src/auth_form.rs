//! Auth form state machine.
//!
//! DESIGN
//! ======
//! `idle -> submitting -> idle` with either a message or an error set on the
//! way out, never both. Only one submission may be in flight; a second
//! `begin` while submitting is refused without touching the form. The
//! network call itself happens outside, between [`AuthForm::begin`] and
//! [`AuthForm::finish`], so the browser client and the native engine drive
//! the same machine.

#[cfg(test)]
#[path = "auth_form_test.rs"]
mod auth_form_test;

use crate::error::FeedError;

/// Client-side minimum; the auth service may enforce more.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Shown after every successful sign-up.
pub const VERIFICATION_SENT_MESSAGE: &str = "Verification sent to email!";

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const SHORT_PASSWORD_MESSAGE: &str = "Password must be at least 6 characters.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormPhase {
    #[default]
    Idle,
    Submitting(AuthAction),
}

/// Why [`AuthForm::begin`] refused to start a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormRejection {
    Busy,
    InvalidEmail,
    PasswordTooShort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    phase: FormPhase,
    message: Option<String>,
    error: Option<String>,
}

impl AuthForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// Both actions are disabled while this is true.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, FormPhase::Submitting(_))
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate and enter `submitting`.
    ///
    /// # Errors
    ///
    /// [`FormRejection::Busy`] leaves the form untouched; validation
    /// rejections set the form error and stay idle.
    pub fn begin(&mut self, action: AuthAction) -> Result<Credentials, FormRejection> {
        if self.is_submitting() {
            return Err(FormRejection::Busy);
        }
        let email = self.email.trim().to_owned();
        if !is_valid_email(&email) {
            self.message = None;
            self.error = Some(INVALID_EMAIL_MESSAGE.to_owned());
            return Err(FormRejection::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            self.message = None;
            self.error = Some(SHORT_PASSWORD_MESSAGE.to_owned());
            return Err(FormRejection::PasswordTooShort);
        }
        self.message = None;
        self.error = None;
        self.phase = FormPhase::Submitting(action);
        Ok(Credentials { email, password: self.password.clone() })
    }

    /// Leave `submitting` with the outcome of the backend call.
    ///
    /// Returns the failure when it is soft, so the caller can log what the
    /// form deliberately does not show.
    pub fn finish(&mut self, outcome: Result<(), FeedError>) -> Option<FeedError> {
        let action = match self.phase {
            FormPhase::Submitting(action) => action,
            FormPhase::Idle => return outcome.err().filter(FeedError::is_soft),
        };
        self.phase = FormPhase::Idle;
        match outcome {
            Ok(()) => {
                self.error = None;
                self.message = match action {
                    AuthAction::SignIn => None,
                    AuthAction::SignUp => Some(VERIFICATION_SENT_MESSAGE.to_owned()),
                };
                None
            }
            Err(failure) if failure.is_soft() => {
                self.error = None;
                Some(failure)
            }
            Err(failure) => {
                self.message = None;
                self.error = failure.user_message();
                None
            }
        }
    }
}

/// The `type="email"` rule: one `@` with something on both sides.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}
