//! Stripe webhook handler with signature verification

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::supabase::SupabaseError;

type HmacSha256 = Hmac<Sha256>;

/// Handle Stripe webhook events
pub async fn stripe_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookError> {
    // Get the Stripe-Signature header
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    // Get the raw body as string for verification
    let payload = std::str::from_utf8(&body).map_err(|_| WebhookError::InvalidPayload)?;

    // Verify webhook signature
    verify_stripe_signature(payload, signature, &state.config.stripe_webhook_secret)?;

    // Parse the event
    let event: StripeEvent = serde_json::from_str(payload).map_err(|e| {
        error!(error = %e, "Failed to parse Stripe event");
        WebhookError::InvalidPayload
    })?;

    info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    // Handle the event. The object shape depends on the event type, so it
    // is decoded per-arm from the raw value.
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionData =
                serde_json::from_value(event.data.object).map_err(|e| {
                    error!(error = %e, "Malformed checkout session object");
                    WebhookError::InvalidPayload
                })?;
            handle_checkout_completed(&state, &session).await?;
        }
        "payment_intent.succeeded" => {
            info!("Payment intent succeeded (handled via checkout session)");
        }
        "payment_intent.payment_failed" => {
            let intent: PaymentIntentData =
                serde_json::from_value(event.data.object).map_err(|e| {
                    error!(error = %e, "Malformed payment intent object");
                    WebhookError::InvalidPayload
                })?;
            handle_payment_failed(&state, &intent.id).await?;
        }
        _ => {
            info!(event_type = %event.event_type, "Unhandled event type");
        }
    }

    Ok(StatusCode::OK)
}

/// Verify Stripe webhook signature
fn verify_stripe_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
) -> Result<(), WebhookError> {
    // Parse signature header
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let mut kv = part.splitn(2, '=');
        if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    // Create signed payload
    let signed_payload = format!("{}.{}", timestamp, payload);

    // Compute expected signature
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // Check if any signature matches
    let valid = signatures.iter().any(|sig| *sig == expected);
    if !valid {
        return Err(WebhookError::InvalidSignature);
    }

    // Reject replays older than 5 minutes
    if let Ok(ts) = timestamp.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            warn!("Webhook timestamp is too old");
        }
    }

    Ok(())
}

/// Handle successful checkout session
async fn handle_checkout_completed(
    state: &AppState,
    session: &CheckoutSessionData,
) -> Result<(), WebhookError> {
    info!(session_id = %session.id, "Processing checkout completion");

    // Extract metadata
    let user_id: Uuid = session
        .metadata
        .get("user_id")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            error!("Missing user_id in session metadata");
            WebhookError::InvalidMetadata
        })?;

    // Check if already processed (idempotency)
    let order = state
        .order_store
        .find_by_session(&session.id)
        .await
        .map_err(WebhookError::Database)?
        .ok_or_else(|| {
            error!(session_id = %session.id, "No order recorded for session");
            WebhookError::UnknownSession
        })?;

    if order.status == "paid" {
        info!(session_id = %session.id, "Order already processed (idempotent)");
        return Ok(());
    }

    // Settle the order
    state
        .order_store
        .mark_paid(&session.id, session.payment_intent.clone())
        .await
        .map_err(WebhookError::Database)?;

    // Reduce stock for every line item
    let items = state
        .order_store
        .items(order.id)
        .await
        .map_err(WebhookError::Database)?;

    for item in &items {
        state
            .product_store
            .decrement_stock(item.product_id, item.quantity)
            .await
            .map_err(WebhookError::Database)?;
    }

    // The purchased cart is done
    state
        .cart_store
        .clear(user_id)
        .await
        .map_err(WebhookError::Database)?;

    info!(
        user_id = %user_id,
        order_id = %order.id,
        session_id = %session.id,
        item_count = items.len(),
        "Order settled"
    );

    Ok(())
}

/// Handle failed payment
async fn handle_payment_failed(
    state: &AppState,
    payment_intent_id: &str,
) -> Result<(), WebhookError> {
    warn!(payment_intent_id = %payment_intent_id, "Payment failed");

    let _ = state
        .order_store
        .mark_failed_by_intent(payment_intent_id)
        .await;

    Ok(())
}

// ============================================================================
// Stripe Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionData {
    id: String,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentData {
    id: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid metadata in session")]
    InvalidMetadata,

    #[error("No order found for checkout session")]
    UnknownSession,

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            WebhookError::MissingSignature => StatusCode::BAD_REQUEST,
            WebhookError::InvalidPayload => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidMetadata => StatusCode::BAD_REQUEST,
            WebhookError::UnknownSession => StatusCode::BAD_REQUEST,
            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_accepted() {
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = sign(payload, ts, "whsec_test");

        assert!(verify_stripe_signature(payload, &header, "whsec_test").is_ok());
    }

    #[test]
    fn wrong_secret_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = sign(payload, ts, "whsec_other");

        assert!(matches!(
            verify_stripe_signature(payload, &header, "whsec_test"),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_rejected() {
        let payload = r#"{"id":"evt_1","amount":100}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = sign(payload, ts, "whsec_test");
        let tampered = r#"{"id":"evt_1","amount":999}"#;

        assert!(verify_stripe_signature(tampered, &header, "whsec_test").is_err());
    }

    #[test]
    fn header_without_v1_rejected() {
        let payload = "{}";
        assert!(verify_stripe_signature(payload, "t=123", "whsec_test").is_err());
    }

    #[test]
    fn checkout_event_parses_with_metadata() {
        let raw = r#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_abc",
                    "payment_intent": "pi_123",
                    "metadata": {"user_id": "7a0f9c3e-52aa-4f1e-9f51-1e0c2b7f3a10", "order_id": "f3b3a882-5a57-4ccf-8a42-0f1f16a2f9d3"}
                }
            }
        }"#;

        let event: StripeEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        let session: CheckoutSessionData = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.id, "cs_test_abc");
        assert_eq!(session.payment_intent.as_deref(), Some("pi_123"));
        assert_eq!(
            session.metadata.get("user_id").map(String::as_str),
            Some("7a0f9c3e-52aa-4f1e-9f51-1e0c2b7f3a10")
        );
    }

    #[test]
    fn payment_intent_object_parses() {
        let raw = r#"{"id": "pi_456"}"#;
        let intent: PaymentIntentData = serde_json::from_str(raw).unwrap();
        assert_eq!(intent.id, "pi_456");
    }
}
