//! User directory port.
//!
//! Read-only lookups into the user store owned by the CRUD layer: roles for
//! staff assignment checks and addresses for notifications.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Role, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_directory_is_object_safe() {
        fn _accepts_dyn(_directory: &dyn UserDirectory) {}
    }
}
