//! HTTP surface for the montumia.com newsletter.
//!
//! Serves the subscribe and unsubscribe endpoints and, optionally, a pre-built
//! copy of the book from disk.

pub mod client_id;
pub mod error;
pub mod pages;
pub mod routes;
pub mod server;

pub use client_id::client_identifier;
pub use error::ApiError;
pub use pages::PageRenderer;
pub use server::{router, AppState, ServerError, SiteServer, SiteServerConfig};
