//! User directory and session record storage.
//!
//! Each user carries at most one session slot: the bcrypt hash of the
//! current refresh secret, its plaintext lookup key, and an expiry. The slot
//! is overwritten on login and rotation, and cleared on logout or when
//! expiry is discovered during rotation.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// A user without any credential material.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    full_name: String,
    email: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            full_name: row.full_name,
            email: row.email,
            role: UserRole::from_str(&row.role),
        }
    }
}

/// A user joined with their live session slot, as returned by the
/// lookup-key query during rotation.
#[derive(Debug, Clone)]
pub struct UserWithSession {
    pub user: User,
    /// Bcrypt hash of the current refresh secret
    pub secret_hash: String,
    /// Plaintext lookup key of the current refresh secret
    pub lookup_key: String,
    /// Expiry of the slot (Unix timestamp)
    pub expires_at: u64,
}

/// Public user summary for the admin surface. Does not expose internal
/// database IDs or credential material.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserSummary {
    pub uuid: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    uuid: String,
    full_name: String,
    email: String,
    role: String,
    created_at: String,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            uuid: row.uuid,
            full_name: row.full_name,
            email: row.email,
            role: UserRole::from_str(&row.role),
            created_at: row.created_at,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with an already-hashed password. Returns the user ID.
    /// Hashing is the caller's job; this store never hashes.
    pub async fn create(
        &self,
        uuid: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, full_name, email, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Check whether an email address is already registered.
    pub async fn email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, uuid, full_name, email, role FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email together with their password hash (login path).
    pub async fn get_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, sqlx::Error> {
        let row: Option<(i64, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, uuid, full_name, email, role, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, uuid, full_name, email, role, password_hash)| {
            (
                User {
                    id,
                    uuid,
                    full_name,
                    email,
                    role: UserRole::from_str(&role),
                },
                password_hash,
            )
        }))
    }

    /// Get a user by internal ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, uuid, full_name, email, role FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by public UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, uuid, full_name, email, role FROM users WHERE uuid = ?")
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Set the role for a user.
    pub async fn set_role(&self, id: i64, role: UserRole) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all users (for the admin surface). Does not expose internal IDs.
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<UserSummaryRow> = sqlx::query_as(
            "SELECT uuid, full_name, email, role, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    /// Overwrite the user's session slot (login/register).
    pub async fn set_session(
        &self,
        user_id: i64,
        lookup_key: &str,
        secret_hash: &str,
        expires_at: u64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET refresh_token_hash = ?, refresh_lookup_key = ?, refresh_expires_at = ? WHERE id = ?",
        )
        .bind(secret_hash)
        .bind(lookup_key)
        .bind(expires_at as i64)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the session slot only if it still holds `old_lookup_key`.
    ///
    /// Rotation uses this as a conditional write: when two requests present
    /// the same secret concurrently, exactly one update matches and the
    /// other caller observes `false`.
    pub async fn replace_session(
        &self,
        user_id: i64,
        old_lookup_key: &str,
        lookup_key: &str,
        secret_hash: &str,
        expires_at: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = ?, refresh_lookup_key = ?, refresh_expires_at = ? \
             WHERE id = ? AND refresh_lookup_key = ?",
        )
        .bind(secret_hash)
        .bind(lookup_key)
        .bind(expires_at as i64)
        .bind(user_id)
        .bind(old_lookup_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empty the session slot (logout, or expiry discovered during rotation).
    pub async fn clear_session(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET refresh_token_hash = NULL, refresh_lookup_key = NULL, refresh_expires_at = NULL WHERE id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Indexed point lookup of the user holding a session slot with the
    /// given lookup key.
    pub async fn find_by_lookup_key(
        &self,
        lookup_key: &str,
    ) -> Result<Option<UserWithSession>, sqlx::Error> {
        let row: Option<(i64, String, String, String, String, String, String, i64)> =
            sqlx::query_as(
                "SELECT id, uuid, full_name, email, role, refresh_token_hash, refresh_lookup_key, refresh_expires_at \
                 FROM users WHERE refresh_lookup_key = ?",
            )
            .bind(lookup_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(
            |(id, uuid, full_name, email, role, secret_hash, lookup_key, expires_at)| {
                UserWithSession {
                    user: User {
                        id,
                        uuid,
                        full_name,
                        email,
                        role: UserRole::from_str(&role),
                    },
                    secret_hash,
                    lookup_key,
                    expires_at: expires_at.max(0) as u64,
                }
            },
        ))
    }
}
