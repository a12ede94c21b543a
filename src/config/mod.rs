//! Configuration constants
//!
//! Default values and well-known URLs.

pub mod defaults;
pub mod urls;
