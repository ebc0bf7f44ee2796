//! PostgreSQL implementation of UserDirectory.

use async_trait::async_trait;
use sqlx::PgPool;

use super::mapping::{parse_text, read_error, user_id};
use crate::domain::foundation::{DomainError, Role, UserId};
use crate::ports::{UserDirectory, UserProfile};

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    full_name: String,
    role: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: user_id("id", row.id)?,
            email: row.email,
            full_name: row.full_name,
            role: parse_text::<Role>("role", &row.role)?,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, full_name, role FROM users WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| read_error("find user", e))?;

        row.map(UserProfile::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_user_role_reads_as_customer() {
        let profile = UserProfile::try_from(UserRow {
            id: 3,
            email: "buyer@example.com".to_string(),
            full_name: "Tran Buyer".to_string(),
            role: "user".to_string(),
        })
        .unwrap();
        assert_eq!(profile.role, Role::Customer);
    }
}
