//! Order storage - pending orders created at checkout, settled by webhook

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// Order row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    pub status: String,
    pub total_cents: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Order line row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// New order for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_session_id: String,
    pub status: String,
    pub total_cents: i64,
}

/// Order store operations
#[derive(Clone)]
pub struct OrderStore {
    client: SupabaseClient,
}

impl OrderStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Record a pending order with its line items
    pub async fn create_pending(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        stripe_session_id: &str,
        total_cents: i64,
        items: &[OrderItem],
    ) -> Result<Order, SupabaseError> {
        let order = NewOrder {
            id: order_id,
            user_id,
            stripe_session_id: stripe_session_id.to_string(),
            status: "pending".to_string(),
            total_cents,
        };

        let created: Order = self.client.insert("orders", &order).await?;

        for item in items {
            let _: serde_json::Value = self.client.insert("order_items", item).await?;
        }

        Ok(created)
    }

    /// Find an order by its checkout session ID
    pub async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, SupabaseError> {
        let query = format!("stripe_session_id=eq.{}", session_id);
        self.client.get_one("orders", &query).await
    }

    /// Line items for an order
    pub async fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, SupabaseError> {
        let query = format!("order_id=eq.{}", order_id);
        self.client.get("order_items", &query).await
    }

    /// Mark the order behind a checkout session as paid
    pub async fn mark_paid(
        &self,
        session_id: &str,
        payment_intent: Option<String>,
    ) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct OrderUpdate {
            status: String,
            stripe_payment_intent: Option<String>,
        }

        let query = format!("stripe_session_id=eq.{}", session_id);
        self.client
            .update(
                "orders",
                &query,
                &OrderUpdate {
                    status: "paid".to_string(),
                    stripe_payment_intent: payment_intent,
                },
            )
            .await
    }

    /// Mark the order behind a payment intent as failed
    pub async fn mark_failed_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct OrderUpdate {
            status: String,
        }

        let query = format!("stripe_payment_intent=eq.{}", payment_intent_id);
        self.client
            .update(
                "orders",
                &query,
                &OrderUpdate {
                    status: "failed".to_string(),
                },
            )
            .await
    }

    /// Orders placed by a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, SupabaseError> {
        let query = format!("user_id=eq.{}&order=created_at.desc", user_id);
        self.client.get("orders", &query).await
    }

    /// All orders, newest first (admin panel)
    pub async fn list_all(&self) -> Result<Vec<Order>, SupabaseError> {
        self.client.get("orders", "order=created_at.desc").await
    }
}
