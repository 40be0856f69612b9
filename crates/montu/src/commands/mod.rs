//! CLI command implementations.

pub mod init;
pub mod link;
pub mod send;
pub mod serve;
