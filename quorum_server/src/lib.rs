//! # Quorum Payment Server
//! This module hosts the server code for the QPS. It is responsible for:
//! Listening for incoming webhook requests from Stripe and verifying their signatures.
//! Converting the Stripe events into gateway events and handing them to the reconciliation engine.
//! Messaging payers on Telegram whenever their booking changes state.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook`: The Stripe webhook route.
//! * `/api/booking-details`: Checkout session details for the booking confirmation page.
//! * `/api/events/{event_id}/...`: Operator routes. These require the admin bearer token.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
