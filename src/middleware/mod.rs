//! Middleware module
//!
//! Contains the access gate applied to relay routes.

pub mod auth;

pub use auth::{AuthMap, AuthStore};
