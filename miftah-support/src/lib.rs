//! # Miftah Support
//!
//! Shared utilities for the Miftah crates.
//!
//! This crate provides:
//! - Rendering of type names and keyed identities for error messages
//! - "Did you mean?" suggestions for failed lookups

pub mod rendering;
