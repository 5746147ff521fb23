//! Core types and utilities for the tandem journal.
//!
//! This crate provides the identifier types and error handling foundation
//! shared by the access layer and the web server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ClientId, ParseIdError, SubscriptionId, UserId};
