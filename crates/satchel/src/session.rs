//! Per-identifier key/value bag with a lazy decode cache.
//!
//! A [`Session`] keeps two tiers of state behind one lock:
//! - the raw [`SessionData`] read from the handler (key -> encoded bytes),
//! - a decoded cache of native values, filled on first `get` or on `set`.
//!
//! Encoding only happens in [`Session::prepare_for_save`], which re-encodes
//! the whole decoded cache so no `set` is ever lost.

use std::any::{Any, type_name};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_bytes::{ByteBuf, Bytes};
use tracing::trace;

use crate::codec::{Codec, MsgPackCodec};
use crate::error::{Error, Result};

/// Reserved key holding the last-touch time as Unix epoch seconds.
///
/// Saving caches it as an `i64`; read it back with `get::<i64>`.
pub const TS_KEY: &str = "_ts";

/// Persisted form of a session: key -> encoded value.
pub type SessionData = BTreeMap<String, Vec<u8>>;

/// Encode a whole session as one blob, writing each value as a byte string.
pub(crate) fn encode_data<C: Codec>(codec: &C, data: &SessionData) -> Result<Vec<u8>> {
    let wire: BTreeMap<&str, &Bytes> = data
        .iter()
        .map(|(key, value)| (key.as_str(), Bytes::new(value)))
        .collect();
    codec.encode(&wire)
}

/// Decode a blob written by [`encode_data`]. An empty blob is an empty session.
pub(crate) fn decode_data<C: Codec>(codec: &C, blob: &[u8]) -> Result<SessionData> {
    let wire: Option<BTreeMap<String, ByteBuf>> = codec.decode(blob)?;
    Ok(wire
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.into_vec()))
        .collect())
}

/// Bound for values stored in a session.
///
/// Values must be encodable, decodable, cloneable out of the cache, and have
/// a default that stands in for "never stored".
pub trait SessionValue: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

impl<T> SessionValue for T where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static
{
}

/// A decoded value plus the monomorphized encoder for its concrete type.
struct CachedValue<C> {
    value: Box<dyn Any + Send + Sync>,
    encode: fn(&(dyn Any + Send + Sync), &C) -> Result<Vec<u8>>,
}

impl<C: Codec> CachedValue<C> {
    fn new<T: SessionValue>(value: T) -> Self {
        Self {
            value: Box::new(value),
            encode: encode_cached::<T, C>,
        }
    }

    fn get<T: SessionValue>(&self, key: &str) -> Result<T> {
        self.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    fn encode(&self, codec: &C) -> Result<Vec<u8>> {
        (self.encode)(&*self.value, codec)
    }
}

fn encode_cached<T: SessionValue, C: Codec>(
    value: &(dyn Any + Send + Sync),
    codec: &C,
) -> Result<Vec<u8>> {
    match value.downcast_ref::<T>() {
        Some(v) => codec.encode(v),
        None => Err(Error::Codec(format!(
            "cached value is not a {}",
            type_name::<T>()
        ))),
    }
}

struct SessionState<C> {
    /// Last time the session was prepared for save (or loaded).
    touched_at: DateTime<Utc>,

    /// Raw encoded fields. `None` until the session is started.
    data: Option<SessionData>,

    /// Decoded values; authoritative over `data` for any key present.
    decoded: HashMap<String, CachedValue<C>>,
}

/// A lazily decoded key/value bag for one session identifier.
///
/// Sessions are created by the [`Manager`](crate::Manager) and handed out as
/// `Arc<Session>`. All methods take `&self`; field-level consistency comes
/// from the session's own lock, independent of the manager's.
pub struct Session<C: Codec = MsgPackCodec> {
    id: String,
    codec: Arc<C>,
    state: RwLock<SessionState<C>>,
}

impl<C: Codec> Session<C> {
    /// A session with no backing data. Every get/set on it fails with `NotStarted`.
    pub(crate) fn unstarted(id: impl Into<String>, codec: Arc<C>) -> Self {
        Self::build(id.into(), codec, None)
    }

    /// A started session over previously loaded data, touched now.
    pub(crate) fn with_data(id: impl Into<String>, codec: Arc<C>, data: SessionData) -> Self {
        Self::build(id.into(), codec, Some(data))
    }

    /// A started session with no data, touched now.
    pub(crate) fn empty(id: impl Into<String>, codec: Arc<C>) -> Self {
        Self::with_data(id, codec, SessionData::new())
    }

    fn build(id: String, codec: Arc<C>, data: Option<SessionData>) -> Self {
        Self {
            id,
            codec,
            state: RwLock::new(SessionState {
                touched_at: Utc::now(),
                data,
                decoded: HashMap::new(),
            }),
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the session has backing data.
    pub fn is_started(&self) -> bool {
        self.state.read().data.is_some()
    }

    /// Last-touch time.
    pub fn touched_at(&self) -> DateTime<Utc> {
        self.state.read().touched_at
    }

    pub(crate) fn set_touched_at(&self, ts: DateTime<Utc>) {
        self.state.write().touched_at = ts;
    }

    /// Read a value, decoding it from the raw data on first access.
    ///
    /// A key that was never set or stored yields `T::default()`. Either way
    /// the result is cached, so later reads skip the raw data entirely.
    pub fn get<T: SessionValue>(&self, key: &str) -> Result<T> {
        {
            let state = self.state.read();
            if state.data.is_none() {
                return Err(Error::NotStarted(self.id.clone()));
            }
            if let Some(cached) = state.decoded.get(key) {
                return cached.get(key);
            }
        }

        let mut state = self.state.write();
        // Another caller may have decoded or set it while we waited.
        if let Some(cached) = state.decoded.get(key) {
            return cached.get(key);
        }

        let value = match state.data.as_ref().and_then(|data| data.get(key)) {
            Some(raw) => self.codec.decode::<T>(raw)?.unwrap_or_default(),
            None => T::default(),
        };

        trace!(session_id = %self.id, key = %key, "Decoded session value");
        state
            .decoded
            .insert(key.to_string(), CachedValue::new(value.clone()));
        Ok(value)
    }

    /// Store a value in the decoded cache, replacing whatever was there.
    ///
    /// Nothing is encoded until the next [`prepare_for_save`](Self::prepare_for_save).
    pub fn set<T: SessionValue>(&self, key: &str, value: T) -> Result<()> {
        let mut state = self.state.write();
        if state.data.is_none() {
            return Err(Error::NotStarted(self.id.clone()));
        }
        state
            .decoded
            .insert(key.to_string(), CachedValue::new(value));
        Ok(())
    }

    /// Drop a key from both the decoded cache and the raw data.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.state.write();
        let Some(data) = state.data.as_mut() else {
            return Err(Error::NotStarted(self.id.clone()));
        };
        data.remove(key);
        state.decoded.remove(key);
        Ok(())
    }

    /// Whether a key is present in either tier.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.read();
        state.decoded.contains_key(key)
            || state.data.as_ref().is_some_and(|data| data.contains_key(key))
    }

    /// All keys present in either tier, sorted.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.read();
        let mut keys: BTreeSet<&String> = state.decoded.keys().collect();
        if let Some(data) = state.data.as_ref() {
            keys.extend(data.keys());
        }
        keys.into_iter().cloned().collect()
    }

    /// Refresh the touch time and encode the decoded cache into the raw data.
    ///
    /// The touch time is stored under [`TS_KEY`] first, so it is persisted
    /// with everything else. Returns a copy of the resulting data.
    pub fn prepare_for_save(&self) -> Result<SessionData> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.data.is_none() {
            return Err(Error::NotStarted(self.id.clone()));
        }

        state.touched_at = Utc::now();
        state.decoded.insert(
            TS_KEY.to_string(),
            CachedValue::new(state.touched_at.timestamp()),
        );

        // Encode everything before touching the raw data so a failure leaves it intact.
        let encoded = state
            .decoded
            .iter()
            .map(|(key, cached)| Ok((key.clone(), cached.encode(&self.codec)?)))
            .collect::<Result<Vec<_>>>()?;

        let data = state.data.get_or_insert_with(SessionData::new);
        data.extend(encoded);

        trace!(
            session_id = %self.id,
            fields = data.len(),
            "Session prepared for save"
        );

        Ok(data.clone())
    }
}

impl<C: Codec> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("started", &state.data.is_some())
            .field("touched_at", &state.touched_at)
            .field("decoded", &state.decoded.len())
            .finish()
    }
}
