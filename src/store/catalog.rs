//! Product catalog storage

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supabase::{SupabaseClient, SupabaseError};

/// Product row as defined in the products table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// New product for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// New products start with empty stock unless told otherwise
    pub stock: i32,
    pub active: bool,
}

/// Partial product update
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Product store operations
#[derive(Clone)]
pub struct ProductStore {
    client: SupabaseClient,
}

impl ProductStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// List active products, newest first
    pub async fn list_active(&self) -> Result<Vec<Product>, SupabaseError> {
        self.client
            .get("products", "active=eq.true&order=created_at.desc")
            .await
    }

    /// Get an active product by ID
    pub async fn get_active(&self, product_id: Uuid) -> Result<Option<Product>, SupabaseError> {
        let query = format!("id=eq.{}&active=eq.true", product_id);
        self.client.get_one("products", &query).await
    }

    /// Get a product regardless of active flag (admin views, webhook)
    pub async fn get(&self, product_id: Uuid) -> Result<Option<Product>, SupabaseError> {
        let query = format!("id=eq.{}", product_id);
        self.client.get_one("products", &query).await
    }

    /// Create a product
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        price_cents: i64,
        stock: i32,
    ) -> Result<Product, SupabaseError> {
        let product = NewProduct {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description,
            price_cents,
            stock,
            active: true,
        };
        self.client.insert("products", &product).await
    }

    /// Apply a partial update to a product
    pub async fn update(
        &self,
        product_id: Uuid,
        update: ProductUpdate,
    ) -> Result<(), SupabaseError> {
        let query = format!("id=eq.{}", product_id);
        self.client.update("products", &query, &update).await
    }

    /// Deactivate a product. Rows are kept so carts and order history
    /// retain valid references.
    pub async fn deactivate(&self, product_id: Uuid) -> Result<(), SupabaseError> {
        self.update(
            product_id,
            ProductUpdate {
                active: Some(false),
                ..ProductUpdate::default()
            },
        )
        .await
    }

    /// Decrement stock after a paid order, clamping at zero
    pub async fn decrement_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        let product = match self.get(product_id).await? {
            Some(p) => p,
            None => return Ok(()), // product removed since purchase, nothing to adjust
        };

        let new_stock = (product.stock - quantity).max(0);
        self.update(
            product_id,
            ProductUpdate {
                stock: Some(new_stock),
                ..ProductUpdate::default()
            },
        )
        .await
    }
}
