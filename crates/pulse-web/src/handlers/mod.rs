//! HTTP handlers for all API routes.

pub mod chat;
pub mod datasets;
pub mod sentiment;
pub mod system;
