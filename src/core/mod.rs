//! Core scanning primitives
//!
//! - Scanner: memchr-accelerated delimiter search over a `str`
//! - Entities: entity decoding (Cow, zero-copy when possible) and escaping
//! - Attributes: start-tag attribute list parsing

pub mod attributes;
pub mod entities;
pub mod scanner;
