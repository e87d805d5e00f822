//! Payment processing via Stripe

pub mod stripe;
pub mod webhook;

pub use stripe::StripeService;
