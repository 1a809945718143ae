//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They validate input, talk to the datastore and the payment gateway, and
//! decide which views go stale.

pub mod access_service;
pub mod content;
pub mod ledger_service;
pub mod order_service;
pub mod payment_service;
pub mod paystack;
pub mod schedule;
pub mod views;
pub mod webhook_service;
