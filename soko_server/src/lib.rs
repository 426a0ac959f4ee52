//! # Soko server
//!
//! The HTTP face of the Soko fulfilment engine. It is responsible for:
//! * Accepting retail and bulk order placements and kicking off the M-Pesa STK push.
//! * Receiving the asynchronous Daraja payment callback and acknowledging it unconditionally.
//! * The seller-acceptance and courier-dispatch endpoints (pool, claim, pickup and delivery scans).
//! * Persisting notifications for every fulfilment transition via the event hooks.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Identity
//! The server sits behind the platform's API gateway, which authenticates users and forwards the verified
//! identity in the `X-User-Id` and `X-User-Role` headers. See [auth](auth/index.html).

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod hooks;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
