pub mod color;
pub mod ease;
pub mod error;
