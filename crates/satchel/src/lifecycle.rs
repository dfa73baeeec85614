//! Lifecycle shared by the session bag and the typed store.

use crate::error::Result;

/// Load-then-persist contract implemented by [`ManagedSession`](crate::ManagedSession)
/// and [`TypedStore`](crate::TypedStore).
pub trait Lifecycle {
    /// Initialize backing storage and load whatever it holds.
    fn start(&mut self) -> Result<()>;

    /// Encode current state and write it to backing storage.
    fn save(&mut self) -> Result<()>;
}
