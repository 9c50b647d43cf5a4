//! Sheet-cutting optimizer: how many rectangular or circular blanks fit on a
//! stock sheet, which grid strategy cuts the most, and what a production run
//! consumes in sheets and kilograms.
//!
//! Everything here is a pure function of its inputs and safe to call from any
//! thread.

pub mod catalog;
pub mod circular;
pub mod consumption;
pub mod error;
pub mod rectangular;
pub mod render;
pub mod request;
pub mod selector;
pub mod types;

pub use error::{EngineError, Result};
