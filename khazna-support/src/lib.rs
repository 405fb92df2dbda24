//! # Khazna Support
//!
//! Shared helpers for the Khazna DI workspace.
//!
//! This crate provides:
//! - Provider-name derivation from Rust type names
//! - Rendering of construction chains and "did you mean" hints for logs

pub mod naming;
pub mod rendering;
