//! Social platform API client for the connected account

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Client for the social platform REST API, authenticated with the
/// account's bearer token
#[derive(Clone)]
pub struct SocialClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SocialClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.social_api_base_url.clone(),
            access_token: config.social_api_token.clone(),
        }
    }

    /// Fetch account metrics (followers, posts, impressions).
    /// One forwarded request; the platform's JSON is returned as-is.
    pub async fn fetch_metrics(&self) -> Result<AccountMetrics, SocialError> {
        let url = format!("{}/account/metrics", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(SocialError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SocialError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(SocialError::Parse)
    }

    /// Publish a single post to the account feed
    pub async fn publish_post(&self, body: &str) -> Result<PublishedPost, SocialError> {
        let url = format!("{}/posts", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&PublishRequest { text: body })
            .send()
            .await
            .map_err(SocialError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SocialError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(SocialError::Parse)
    }
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    text: &'a str,
}

/// Account metrics as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMetrics {
    pub followers: u64,
    pub posts: u64,
    #[serde(default)]
    pub impressions: Option<u64>,
}

/// Platform acknowledgement of a published post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
}

/// Social platform errors
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Platform API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_parse_with_and_without_impressions() {
        let full: AccountMetrics =
            serde_json::from_str(r#"{"followers": 1200, "posts": 48, "impressions": 90210}"#)
                .unwrap();
        assert_eq!(full.followers, 1200);
        assert_eq!(full.impressions, Some(90210));

        let minimal: AccountMetrics =
            serde_json::from_str(r#"{"followers": 3, "posts": 0}"#).unwrap();
        assert_eq!(minimal.posts, 0);
        assert!(minimal.impressions.is_none());
    }
}
