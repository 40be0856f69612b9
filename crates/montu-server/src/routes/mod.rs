//! Request handlers.

pub mod subscribe;
pub mod unsubscribe;
