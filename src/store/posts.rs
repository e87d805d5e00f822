//! Scheduled social post storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// Scheduled post row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    /// scheduled | posted | failed
    pub status: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New scheduled post for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewScheduledPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
}

/// Scheduled post store operations
#[derive(Clone)]
pub struct ScheduledPostStore {
    client: SupabaseClient,
}

impl ScheduledPostStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Queue a post for publication
    pub async fn schedule(
        &self,
        user_id: Uuid,
        body: &str,
        scheduled_for: DateTime<Utc>,
    ) -> Result<ScheduledPost, SupabaseError> {
        let post = NewScheduledPost {
            id: Uuid::new_v4(),
            user_id,
            body: body.to_string(),
            scheduled_for,
            status: "scheduled".to_string(),
        };
        self.client.insert("scheduled_posts", &post).await
    }

    /// A user's posts, newest schedule first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ScheduledPost>, SupabaseError> {
        let query = format!("user_id=eq.{}&order=scheduled_for.desc", user_id);
        self.client.get("scheduled_posts", &query).await
    }

    /// Posts whose time has come and are still unpublished, oldest first
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>, SupabaseError> {
        // UTC with a Z suffix keeps the query string free of '+'
        let cutoff = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let query = format!(
            "status=eq.scheduled&scheduled_for=lte.{}&order=scheduled_for.asc",
            cutoff
        );
        self.client.get("scheduled_posts", &query).await
    }

    /// Record a successful publication
    pub async fn mark_posted(&self, post_id: Uuid) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct PostUpdate {
            status: String,
            posted_at: DateTime<Utc>,
        }

        let query = format!("id=eq.{}", post_id);
        self.client
            .update(
                "scheduled_posts",
                &query,
                &PostUpdate {
                    status: "posted".to_string(),
                    posted_at: Utc::now(),
                },
            )
            .await
    }

    /// Record a failed publication. The row keeps the error and is not
    /// picked up again.
    pub async fn mark_failed(&self, post_id: Uuid, error: &str) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct PostUpdate {
            status: String,
            last_error: String,
        }

        let query = format!("id=eq.{}", post_id);
        self.client
            .update(
                "scheduled_posts",
                &query,
                &PostUpdate {
                    status: "failed".to_string(),
                    last_error: error.to_string(),
                },
            )
            .await
    }
}
