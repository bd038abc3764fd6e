//! Property values and their four evaluation strategies.
//!
//! A [`PropertyValue`](value::PropertyValue) pairs a raw style input with
//! its compiled expression; its schema record's
//! [`PropertyKind`](crate::schema::PropertyKind) selects how
//! possibly-evaluation, interpolation, and per-feature evaluation behave.

pub mod evaluated;
pub mod registry;
pub mod value;
