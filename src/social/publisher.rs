//! Background publisher for scheduled posts

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info, warn};

use crate::store::ScheduledPostStore;

use super::client::SocialClient;

/// Publishes due posts on a fixed interval.
///
/// Runs as a single task: ticks never overlap, and each post's outcome is
/// written back to its row before the next one is attempted. A post that
/// fails to publish stays `failed` until someone reschedules it.
pub struct PostPublisher {
    posts: ScheduledPostStore,
    social: SocialClient,
    interval_secs: u64,
    published_total: AtomicU64,
    failed_total: AtomicU64,
}

impl PostPublisher {
    pub fn new(posts: ScheduledPostStore, social: SocialClient, interval_secs: u64) -> Self {
        Self {
            posts,
            social,
            interval_secs,
            published_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
        }
    }

    /// Run the publisher loop (periodic due-post processing)
    pub async fn run(&self) {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(self.interval_secs));

        loop {
            interval.tick().await;
            self.process_due_posts().await;
        }
    }

    /// One tick: fetch everything that is due and publish sequentially
    async fn process_due_posts(&self) {
        let due = match self.posts.due(chrono::Utc::now()).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Failed to fetch due posts");
                return;
            }
        };

        if due.is_empty() {
            return;
        }

        info!(count = due.len(), "Publishing due posts");

        for post in due {
            match self.social.publish_post(&post.body).await {
                Ok(published) => {
                    self.published_total.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = self.posts.mark_posted(post.id).await {
                        // Published but not recorded - the next tick would
                        // publish it again, so this is worth shouting about
                        error!(post_id = %post.id, error = %e, "Published post but failed to record it");
                    } else {
                        info!(
                            post_id = %post.id,
                            platform_id = %published.id,
                            "Post published"
                        );
                    }
                }
                Err(e) => {
                    self.failed_total.fetch_add(1, Ordering::Relaxed);
                    warn!(post_id = %post.id, error = %e, "Failed to publish post");
                    if let Err(e) = self.posts.mark_failed(post.id, &e.to_string()).await {
                        error!(post_id = %post.id, error = %e, "Failed to record publish failure");
                    }
                }
            }
        }
    }

    /// Posts published since startup
    pub fn published_total(&self) -> u64 {
        self.published_total.load(Ordering::Relaxed)
    }

    /// Publish failures since startup
    pub fn failed_total(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }
}
