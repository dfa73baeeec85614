//! Session manager: multiplexes many sessions by identifier.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::codec::{Codec, MsgPackCodec};
use crate::error::Result;
use crate::handler::Handler;
use crate::lifecycle::Lifecycle;
use crate::session::{Session, SessionData, TS_KEY, decode_data, encode_data};

/// Inner state protected by RwLock.
struct ManagerInner<C: Codec> {
    /// Active sessions.
    sessions: HashMap<String, Arc<Session<C>>>,

    /// Last-known persisted form of each active session.
    raw: HashMap<String, SessionData>,

    /// Identifiers whose `start` has completed.
    started: HashSet<String>,
}

/// Owns the active sessions and drives them against a [`Handler`].
///
/// The manager's table is guarded by one reader/writer lock; each session
/// carries its own lock, so callers working on different sessions never
/// contend once they hold their `Arc<Session>`.
pub struct Manager<H: Handler, C: Codec = MsgPackCodec> {
    handler: H,
    codec: Arc<C>,
    inner: RwLock<ManagerInner<C>>,
}

impl<H: Handler> Manager<H> {
    /// Create a manager using the MessagePack codec.
    pub fn new(handler: H) -> Self {
        Self::with_codec(handler, MsgPackCodec::new())
    }
}

impl<H: Handler, C: Codec> Manager<H, C> {
    /// Create a manager with a custom codec.
    pub fn with_codec(handler: H, codec: C) -> Self {
        Self {
            handler,
            codec: Arc::new(codec),
            inner: RwLock::new(ManagerInner {
                sessions: HashMap::new(),
                raw: HashMap::new(),
                started: HashSet::new(),
            }),
        }
    }

    /// The persistence handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Start a session, loading any stored data.
    ///
    /// Starting an identifier that is already started does nothing.
    pub fn start(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();

        if inner.started.contains(id) {
            trace!(session_id = %id, "Session already started");
            return Ok(());
        }

        self.handler.init(id)?;
        let raw = self.handler.read(id)?;
        let data = decode_data(&*self.codec, &raw)?;

        let session = Session::with_data(id, Arc::clone(&self.codec), data.clone());
        // Read straight from the raw data so `_ts` stays uncached until the next save.
        if let Some(raw_ts) = data.get(TS_KEY)
            && let Ok(Some(ts)) = self.codec.decode::<i64>(raw_ts)
            && ts > 0
            && let Some(touched_at) = DateTime::from_timestamp(ts, 0)
        {
            session.set_touched_at(touched_at);
        }

        debug!(
            session_id = %id,
            fields = data.len(),
            "Session started"
        );

        inner.sessions.insert(id.to_string(), Arc::new(session));
        inner.raw.insert(id.to_string(), data);
        inner.started.insert(id.to_string());
        Ok(())
    }

    /// Encode the session and write it through the handler.
    ///
    /// Saving an identifier with no active session does nothing.
    pub fn save(&self, id: &str) -> Result<()> {
        // Prepare under the table lock so GC cannot reset the session halfway
        // through; a save that loses the race writes the fresh session instead.
        let data = {
            let mut inner = self.inner.write();
            let Some(session) = inner.sessions.get(id).cloned() else {
                trace!(session_id = %id, "No active session to save");
                return Ok(());
            };
            let data = session.prepare_for_save()?;
            inner.raw.insert(id.to_string(), data.clone());
            data
        };

        let blob = encode_data(&*self.codec, &data)?;
        self.handler.write(id, &blob)?;

        debug!(session_id = %id, bytes = blob.len(), "Session saved");
        Ok(())
    }

    /// Get the active session for an identifier.
    ///
    /// If the identifier is not started, returns a detached session that
    /// rejects every get/set with `NotStarted`.
    pub fn get(&self, id: &str) -> Arc<Session<C>> {
        let inner = self.inner.read();
        if inner.started.contains(id)
            && let Some(session) = inner.sessions.get(id)
        {
            return Arc::clone(session);
        }
        Arc::new(Session::unstarted(id, Arc::clone(&self.codec)))
    }

    /// A [`Lifecycle`] view of one identifier.
    pub fn session(&self, id: impl Into<String>) -> ManagedSession<'_, H, C> {
        ManagedSession {
            manager: self,
            id: id.into(),
        }
    }

    /// Reset sessions untouched for longer than `max_lifetime`, then run the handler's GC.
    ///
    /// Expired sessions are replaced by empty ones under the same identifier;
    /// their data is discarded, not flushed. The handler judges age by its
    /// own means, so the two passes need not agree.
    pub fn gc(&self, max_lifetime: Duration) -> Result<()> {
        let cutoff = chrono::Duration::from_std(max_lifetime)
            .ok()
            .and_then(|lifetime| Utc::now().checked_sub_signed(lifetime));

        if let Some(cutoff) = cutoff {
            let expired = self.expire_before(cutoff);
            if expired > 0 {
                debug!(count = expired, "Reset expired sessions");
            }
        }

        self.handler.gc(max_lifetime)
    }

    fn expire_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();

        let expired: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, session)| session.touched_at() < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            trace!(session_id = %id, "Session expired");
            let fresh = Session::empty(id.as_str(), Arc::clone(&self.codec));
            inner.sessions.insert(id.clone(), Arc::new(fresh));
            inner.raw.insert(id.clone(), SessionData::new());
        }

        expired.len()
    }

    /// Forget a session and remove its stored blob.
    pub fn destroy(&self, id: &str) -> Result<()> {
        {
            let mut inner = self.inner.write();
            inner.sessions.remove(id);
            inner.raw.remove(id);
            inner.started.remove(id);
        }

        self.handler.destroy(id)?;
        debug!(session_id = %id, "Session destroyed");
        Ok(())
    }

    /// Whether `start` has completed for an identifier.
    pub fn is_started(&self, id: &str) -> bool {
        self.inner.read().started.contains(id)
    }

    /// The last-known persisted form of a session, as of its last start, save, or GC reset.
    pub fn data(&self, id: &str) -> Option<SessionData> {
        self.inner.read().raw.get(id).cloned()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    /// Check if there are no active sessions.
    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }

    /// Identifiers of all active sessions, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get manager statistics.
    pub fn stats(&self) -> ManagerStats {
        let inner = self.inner.read();
        ManagerStats {
            active: inner.sessions.len(),
            started: inner.started.len(),
        }
    }
}

/// Manager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    /// Number of active sessions.
    pub active: usize,

    /// Number of started identifiers.
    pub started: usize,
}

/// One identifier within a [`Manager`], usable through [`Lifecycle`].
pub struct ManagedSession<'a, H: Handler, C: Codec = MsgPackCodec> {
    manager: &'a Manager<H, C>,
    id: String,
}

impl<H: Handler, C: Codec> ManagedSession<'_, H, C> {
    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The active session (or a detached, unstarted one).
    pub fn get(&self) -> Arc<Session<C>> {
        self.manager.get(&self.id)
    }
}

impl<H: Handler, C: Codec> Lifecycle for ManagedSession<'_, H, C> {
    fn start(&mut self) -> Result<()> {
        self.manager.start(&self.id)
    }

    fn save(&mut self) -> Result<()> {
        self.manager.save(&self.id)
    }
}
