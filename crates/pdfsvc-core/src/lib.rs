//! # pdfsvc-core
//!
//! Core crate for the RCS PDF service. Contains configuration schemas and
//! the unified error system.
//!
//! This crate has **no** internal dependencies on other pdfsvc crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
