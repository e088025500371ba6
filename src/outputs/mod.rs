//! Digest output.
//!
//! - [`json`]: writes the [`Digest`](crate::models::Digest) under a date directory
//! - [`text`]: renders it as plain text for stdout

pub mod json;
pub mod text;
