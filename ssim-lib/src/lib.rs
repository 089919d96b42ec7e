#![doc = include_str!("../README.md")]

mod error;

pub mod assemble;
pub mod carriers;
pub mod dialect;
pub mod fields;
pub mod payload;
pub mod record;
pub mod timeconv;
pub mod timezone;
pub mod transform;

pub use error::{Error, Result};
