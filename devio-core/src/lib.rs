//! Threaded discussions on posts: the comment forest, likes and the service that
//! orchestrates them over pluggable stores.

pub mod error;
pub mod lock;
pub mod memory;
pub mod reaction;
pub mod service;
pub mod store;
#[cfg(test)]
mod testing;
pub mod thread;
pub mod tree;

pub use error::{ErrorKind, StoreError, ThreadError, ValidationError};
pub use service::PostService;
