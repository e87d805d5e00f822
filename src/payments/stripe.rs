//! Stripe checkout session creation

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::store::carts::CartItemWithProduct;
use crate::store::orders::OrderItem;
use crate::store::supabase::SupabaseError;
use crate::store::{CartStore, OrderStore};

/// Stripe service for payment operations
#[derive(Clone)]
pub struct StripeService {
    client: Client,
    carts: CartStore,
    orders: OrderStore,
    stripe_secret_key: String,
    client_origin: String,
}

impl StripeService {
    pub fn new(config: &Config, carts: CartStore, orders: OrderStore) -> Self {
        Self {
            client: Client::new(),
            carts,
            orders,
            stripe_secret_key: config.stripe_secret_key.clone(),
            client_origin: config.client_origin.clone(),
        }
    }

    /// Create a checkout session for the user's current cart
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
    ) -> Result<CheckoutSessionResponse, StripeError> {
        let cart = self
            .carts
            .get_cart(user_id)
            .await
            .map_err(StripeError::Database)?;

        if cart.is_empty() {
            return Err(StripeError::EmptyCart);
        }

        // Every cart row must still point at a purchasable product
        let lines = cart_lines(&cart)?;
        let total_cents: i64 = lines
            .iter()
            .map(|l| l.unit_price_cents * l.quantity as i64)
            .sum();

        // Generate order ID up front so it rides along in session metadata
        let order_id = Uuid::new_v4();

        let success_url = format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.client_origin
        );
        let cancel_url = format!("{}/checkout/cancel", self.client_origin);

        let mut form_data: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url),
            ("cancel_url".to_string(), cancel_url),
            ("client_reference_id".to_string(), user_id.to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
            ("metadata[order_id]".to_string(), order_id.to_string()),
        ];
        form_data.extend(line_item_form_data(&lines));

        // Call Stripe API
        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.stripe_secret_key, None::<&str>)
            .form(&form_data)
            .send()
            .await
            .map_err(StripeError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session: StripeSession = response.json().await.map_err(StripeError::Request)?;

        let session_id = session.id.clone();
        let session_url = session.url.ok_or(StripeError::NoSessionUrl)?;

        // Record the pending order; the webhook settles it
        let order_items: Vec<OrderItem> = lines
            .iter()
            .map(|l| OrderItem {
                order_id,
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect();

        self.orders
            .create_pending(order_id, user_id, &session_id, total_cents, &order_items)
            .await
            .map_err(StripeError::Database)?;

        Ok(CheckoutSessionResponse {
            session_id,
            url: session_url,
        })
    }
}

/// A priced cart line ready for Stripe
#[derive(Debug, Clone, PartialEq)]
struct CartLine {
    product_id: Uuid,
    name: String,
    unit_price_cents: i64,
    quantity: i32,
}

/// Validate cart rows into priced lines
fn cart_lines(cart: &[CartItemWithProduct]) -> Result<Vec<CartLine>, StripeError> {
    cart.iter()
        .map(|item| {
            let product = item
                .product
                .as_ref()
                .filter(|p| p.active)
                .ok_or(StripeError::ItemUnavailable(item.product_id))?;

            Ok(CartLine {
                product_id: item.product_id,
                name: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity: item.quantity,
            })
        })
        .collect()
}

/// Build the indexed line_items form fields for the session request
fn line_item_form_data(lines: &[CartLine]) -> Vec<(String, String)> {
    let mut form_data = Vec::with_capacity(lines.len() * 4);

    for (i, line) in lines.iter().enumerate() {
        form_data.push((
            format!("line_items[{}][price_data][currency]", i),
            "usd".to_string(),
        ));
        form_data.push((
            format!("line_items[{}][price_data][unit_amount]", i),
            line.unit_price_cents.to_string(),
        ));
        form_data.push((
            format!("line_items[{}][price_data][product_data][name]", i),
            line.name.clone(),
        ));
        form_data.push((
            format!("line_items[{}][quantity]", i),
            line.quantity.to_string(),
        ));
    }

    form_data
}

/// Stripe checkout session response
#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

/// Response from checkout session creation
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: String,
}

/// Stripe-related errors
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart item {0} is no longer available")]
    ItemUnavailable(Uuid),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("No session URL returned")]
    NoSessionUrl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::carts::CartProductDetails;

    fn cart_row(name: &str, price_cents: i64, quantity: i32, active: bool) -> CartItemWithProduct {
        let id = Uuid::new_v4();
        CartItemWithProduct {
            product_id: id,
            quantity,
            product: Some(CartProductDetails {
                id,
                name: name.to_string(),
                price_cents,
                active,
            }),
        }
    }

    #[test]
    fn line_items_are_indexed_per_row() {
        let cart = vec![cart_row("Mug", 1500, 2, true), cart_row("Shirt", 2500, 1, true)];
        let lines = cart_lines(&cart).unwrap();
        let form = line_item_form_data(&lines);

        assert_eq!(form.len(), 8);
        assert_eq!(
            form[0],
            (
                "line_items[0][price_data][currency]".to_string(),
                "usd".to_string()
            )
        );
        assert_eq!(
            form[1],
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                "1500".to_string()
            )
        );
        assert_eq!(
            form[3],
            ("line_items[0][quantity]".to_string(), "2".to_string())
        );
        assert_eq!(
            form[6],
            (
                "line_items[1][price_data][product_data][name]".to_string(),
                "Shirt".to_string()
            )
        );
    }

    #[test]
    fn inactive_product_fails_validation() {
        let cart = vec![cart_row("Gone", 1000, 1, false)];
        assert!(matches!(
            cart_lines(&cart),
            Err(StripeError::ItemUnavailable(_))
        ));
    }

    #[test]
    fn missing_product_join_fails_validation() {
        let cart = vec![CartItemWithProduct {
            product_id: Uuid::new_v4(),
            quantity: 1,
            product: None,
        }];
        assert!(matches!(
            cart_lines(&cart),
            Err(StripeError::ItemUnavailable(_))
        ));
    }
}
