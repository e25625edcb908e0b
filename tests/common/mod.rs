//! Common test utilities and helpers
//!
//! - Fake REST API
//! - Session fixtures over in-memory sockets and stores

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

pub use fakes::*;
pub use fixtures::*;
