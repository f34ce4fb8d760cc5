//! Common utilities and shared components

pub mod constants;
pub mod error;
pub mod length;

pub use constants::*;
pub use error::*;
pub use length::*;
