#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod config;
mod error;
mod pool;
mod poolable;
mod registry;

pub use config::*;
pub use error::*;
pub use pool::*;
pub use poolable::*;
pub use registry::*;
