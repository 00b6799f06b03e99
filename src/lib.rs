//! The `taskkeeper` library crate.
//!
//! This crate contains the domain models, authentication mechanisms, store
//! queries, routing configuration, and error handling for the TaskKeeper API.
//! It is used by the main binary (`main.rs`) to construct and run the
//! application.

pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
