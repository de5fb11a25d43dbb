use std::fmt;

use crate::errors::AppError;

/// A user-supplied API key, held for the lifetime of one session.
///
/// Never validated locally: a bad key only shows up as a provider error.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation(
                "Veuillez entrer votre clé API OpenAI".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
