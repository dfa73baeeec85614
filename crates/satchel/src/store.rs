//! Typed store: one identifier bound to one strongly-typed payload.
//!
//! Unlike [`Session`](crate::Session), a [`TypedStore`] has no per-key bag,
//! no decode cache, and no lock. The whole payload is decoded on `start`
//! and encoded on `save`; callers coordinate access through `&mut`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec::{Codec, MsgPackCodec};
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::lifecycle::Lifecycle;

/// A single typed payload persisted under one identifier.
#[derive(Debug)]
pub struct TypedStore<T, H: Handler, C: Codec = MsgPackCodec> {
    id: String,
    handler: H,
    codec: C,

    /// Last blob read from the handler.
    raw: Vec<u8>,

    /// Decoded payload; `None` until started.
    value: Option<T>,
}

impl<T, H> TypedStore<T, H>
where
    T: Serialize + DeserializeOwned + Default,
    H: Handler,
{
    /// Create an unstarted store using the MessagePack codec.
    pub fn new(handler: H, id: impl Into<String>) -> Self {
        Self::with_codec(handler, id, MsgPackCodec::new())
    }
}

impl<T, H, C> TypedStore<T, H, C>
where
    T: Serialize + DeserializeOwned + Default,
    H: Handler,
    C: Codec,
{
    /// Create an unstarted store with a custom codec.
    pub fn with_codec(handler: H, id: impl Into<String>, codec: C) -> Self {
        Self {
            id: id.into(),
            handler,
            codec,
            raw: Vec::new(),
            value: None,
        }
    }

    /// The store identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether `start` has completed.
    pub fn is_started(&self) -> bool {
        self.value.is_some()
    }

    /// The blob read by the last `start`.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Initialize storage and decode the stored payload.
    ///
    /// A missing or empty blob yields `T::default()`. Calling this again
    /// reloads from the handler and drops unsaved changes.
    pub fn start(&mut self) -> Result<()> {
        self.handler.init(&self.id)?;
        let raw = self.handler.read(&self.id)?;
        let value = self.codec.decode::<T>(&raw)?.unwrap_or_default();

        debug!(store_id = %self.id, bytes = raw.len(), "Typed store started");
        self.raw = raw;
        self.value = Some(value);
        Ok(())
    }

    /// The held payload.
    pub fn get(&self) -> Result<&T> {
        self.value
            .as_ref()
            .ok_or_else(|| Error::NotStarted(self.id.clone()))
    }

    /// Mutable access to the held payload; changes persist on the next `save`.
    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.value
            .as_mut()
            .ok_or_else(|| Error::NotStarted(self.id.clone()))
    }

    /// Replace the held payload.
    pub fn set(&mut self, value: T) -> Result<()> {
        *self.get_mut()? = value;
        Ok(())
    }

    /// Encode the held payload and write it through the handler.
    pub fn save(&self) -> Result<()> {
        let value = self.get()?;
        let blob = self.codec.encode(value)?;
        self.handler.write(&self.id, &blob)?;

        debug!(store_id = %self.id, bytes = blob.len(), "Typed store saved");
        Ok(())
    }
}

impl<T, H, C> Lifecycle for TypedStore<T, H, C>
where
    T: Serialize + DeserializeOwned + Default,
    H: Handler,
    C: Codec,
{
    fn start(&mut self) -> Result<()> {
        TypedStore::start(self)
    }

    fn save(&mut self) -> Result<()> {
        TypedStore::save(self)
    }
}
