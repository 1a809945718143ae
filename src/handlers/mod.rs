//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string, path params)
//! 2. Hands it to a service
//! 3. Returns HTTP response (JSON, status code)

/// Admin order endpoints
pub mod admin;
pub mod checkout;
pub mod downloads;
pub mod health;
pub mod payments;
pub mod subscription;
pub mod webhooks;
