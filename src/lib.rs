//! Netskel Library
//!
//! Per-user file distribution: a generated bootstrap client, a `.netskeldb`
//! manifest of each user's tree, and sanitized file delivery.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod files;
pub mod fs_enum;
pub mod http;
pub mod logger;
pub mod manifest;
pub mod sanitize;
pub mod script;
pub mod service;

pub use error::{NetskelError, Result};
pub use service::{FileBody, Netskel};
