//! Store queries, grouped per collection.
//!
//! All SQL lives here so that handlers stay at the level of operations.
//! Queries are runtime-checked (`sqlx::query_as`) and every client-facing
//! task lookup carries both the id and the owner predicate in the statement
//! itself, never as an in-memory check after the fetch.

pub mod sessions;
pub mod tasks;
pub mod users;
