//! Data models representing database entities and API payloads.

/// Orders and checkout
pub mod order;
/// Payment gateway wire types
pub mod paystack;
/// Subscription tokens, download ledger and feedback
pub mod subscription;
