//! User account storage

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// User account row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub admin: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// New user for insertion. The admin flag is intentionally absent:
/// the column defaults to false and is only ever flipped in the database.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Public view of an account, safe to return to clients
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub admin: bool,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            admin: user.admin,
        }
    }
}

/// User store operations
#[derive(Clone)]
pub struct UserStore {
    client: SupabaseClient,
}

impl UserStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Look up an account by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, SupabaseError> {
        let query = format!("email=eq.{}", email);
        self.client.get_one("users", &query).await
    }

    /// Look up an account by ID
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, SupabaseError> {
        let query = format!("id=eq.{}", user_id);
        self.client.get_one("users", &query).await
    }

    /// Create a new account. Email and username uniqueness is enforced by
    /// database constraints; violations surface as `is_unique_violation`.
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, SupabaseError> {
        let user = NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        self.client.insert("users", &user).await
    }

    /// List all accounts (admin panel)
    pub async fn list_all(&self) -> Result<Vec<UserRecord>, SupabaseError> {
        self.client.get("users", "order=created_at.desc").await
    }
}
