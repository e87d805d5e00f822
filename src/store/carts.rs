//! Shopping cart storage

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// Cart row joined with product details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemWithProduct {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(rename = "products")]
    pub product: Option<CartProductDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartProductDetails {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub active: bool,
}

/// New cart entry for upsert
#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart store operations
#[derive(Clone)]
pub struct CartStore {
    client: SupabaseClient,
}

impl CartStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Get a user's cart with product details
    pub async fn get_cart(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CartItemWithProduct>, SupabaseError> {
        let query = format!(
            "user_id=eq.{}&select=product_id,quantity,products(id,name,price_cents,active)",
            user_id
        );
        self.client.get("cart_items", &query).await
    }

    /// Add or replace an item in the cart (one row per user/product pair)
    pub async fn set_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        let entry = NewCartItem {
            user_id,
            product_id,
            quantity,
        };
        self.client
            .upsert("cart_items", &entry, "user_id,product_id")
            .await
    }

    /// Remove an item from the cart. Removing an absent item is a no-op.
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), SupabaseError> {
        let query = format!("user_id=eq.{}&product_id=eq.{}", user_id, product_id);
        self.client.delete("cart_items", &query).await
    }

    /// Empty a user's cart (after successful checkout)
    pub async fn clear(&self, user_id: Uuid) -> Result<(), SupabaseError> {
        let query = format!("user_id=eq.{}", user_id);
        self.client.delete("cart_items", &query).await
    }
}
