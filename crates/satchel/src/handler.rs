//! Persistence handler capability.
//!
//! The store is decoupled from concrete storage through the [`Handler`]
//! trait. A handler persists one opaque blob per session identifier and
//! knows how to reclaim blobs that have aged out.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Trait for persistence backends.
///
/// Handlers must tolerate concurrent calls for different identifiers and
/// serialize (or otherwise tolerate) concurrent calls for the same one.
pub trait Handler: Send + Sync {
    /// Prepare storage for a session before it is first read.
    fn init(&self, id: &str) -> Result<()>;

    /// Read the stored blob.
    ///
    /// A missing identifier yields an empty blob rather than an error.
    fn read(&self, id: &str) -> Result<Vec<u8>>;

    /// Replace the stored blob.
    fn write(&self, id: &str, data: &[u8]) -> Result<()>;

    /// Remove the stored blob.
    fn destroy(&self, id: &str) -> Result<()>;

    /// Reclaim blobs older than `max_lifetime`, by the handler's own notion of age.
    fn gc(&self, max_lifetime: Duration) -> Result<()>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn init(&self, id: &str) -> Result<()> {
        (**self).init(id)
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        (**self).read(id)
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        (**self).write(id, data)
    }

    fn destroy(&self, id: &str) -> Result<()> {
        (**self).destroy(id)
    }

    fn gc(&self, max_lifetime: Duration) -> Result<()> {
        (**self).gc(max_lifetime)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn init(&self, id: &str) -> Result<()> {
        (**self).init(id)
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        (**self).read(id)
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        (**self).write(id, data)
    }

    fn destroy(&self, id: &str) -> Result<()> {
        (**self).destroy(id)
    }

    fn gc(&self, max_lifetime: Duration) -> Result<()> {
        (**self).gc(max_lifetime)
    }
}
