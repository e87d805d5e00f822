//! Social platform integration: metrics and scheduled publishing

pub mod client;
pub mod publisher;

pub use client::SocialClient;
pub use publisher::PostPublisher;
