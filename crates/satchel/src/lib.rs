//! Pluggable session-state store.
//!
//! This crate provides per-identifier session state with:
//! - A lazy two-tier cache (raw encoded fields + decoded values) per session
//! - A manager that multiplexes sessions and drives a persistence [`Handler`]
//! - Time-based GC, both in memory and in the handler
//! - A [`TypedStore`] variant binding one identifier to one typed payload
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel::Manager;
//! use satchel_handlers::MemoryHandler;
//!
//! let manager = Manager::new(MemoryHandler::new());
//! manager.start("abc")?;
//! manager.get("abc").set("user", "alice".to_string())?;
//! manager.save("abc")?;
//! ```

mod codec;
mod config;
mod error;
mod gc;
mod handler;
mod lifecycle;
mod manager;
mod session;
mod store;

pub use codec::{Codec, JsonCodec, MsgPackCodec};
pub use config::{DEFAULT_GC_INTERVAL, DEFAULT_MAX_LIFETIME, ManagerConfig};
pub use error::{Error, Result};
pub use handler::Handler;
pub use lifecycle::Lifecycle;
pub use manager::{ManagedSession, Manager, ManagerStats};
pub use session::{Session, SessionData, SessionValue, TS_KEY};
pub use store::TypedStore;
