//! Mock session validator for tests.
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_actor("admin-token", Actor::admin(UserId::new(1)?));
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{Actor, AuthError};
use crate::ports::SessionValidator;

/// Maps fixed tokens to actors. Unknown tokens are `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, Actor>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(self, token: impl Into<String>, actor: Actor) -> Self {
        self.add_token(token, actor);
        self
    }

    /// Every validation fails with this error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn add_token(&self, token: impl Into<String>, actor: Actor) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), actor);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<Actor, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[tokio::test]
    async fn known_token_returns_actor() {
        let actor = Actor::customer(UserId::new(3).unwrap());
        let validator = MockSessionValidator::new().with_actor("tok", actor);
        assert_eq!(validator.validate("tok").await.unwrap(), actor);
        assert_eq!(validator.validate("other").await.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn forced_error_wins() {
        let validator = MockSessionValidator::new()
            .with_actor("tok", Actor::admin(UserId::new(1).unwrap()))
            .with_error(AuthError::ServiceUnavailable("down".into()));
        assert!(matches!(
            validator.validate("tok").await,
            Err(AuthError::ServiceUnavailable(_))
        ));
    }
}
