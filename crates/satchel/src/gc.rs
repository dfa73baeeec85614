//! Background garbage collection for a shared manager.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::codec::Codec;
use crate::config::ManagerConfig;
use crate::handler::Handler;
use crate::manager::Manager;

impl<H, C> Manager<H, C>
where
    H: Handler + 'static,
    C: Codec,
{
    /// Spawn a task that runs [`Manager::gc`] every `config.gc_interval`.
    ///
    /// Returns `None` if `config.enable_gc_task` is false. The task holds a
    /// weak reference and stops once the manager is dropped. GC passes run on
    /// the blocking pool since handler I/O is synchronous. Must be called
    /// from within a tokio runtime.
    pub fn spawn_gc_task(self: &Arc<Self>, config: &ManagerConfig) -> Option<JoinHandle<()>> {
        if !config.enable_gc_task {
            return None;
        }

        let manager = Arc::downgrade(self);
        let max_lifetime = config.max_lifetime;
        let period = config.gc_interval.max(Duration::from_millis(1));

        debug!(
            ?period,
            ?max_lifetime,
            "Starting session GC task"
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(manager) = manager.upgrade() else {
                    debug!("Session manager dropped, stopping GC task");
                    break;
                };

                match tokio::task::spawn_blocking(move || manager.gc(max_lifetime)).await {
                    Ok(Ok(())) => trace!("Session GC pass complete"),
                    Ok(Err(e)) => debug!(error = %e, "Session GC pass failed"),
                    Err(e) => debug!(error = %e, "Session GC pass aborted"),
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::MapHandler;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_disabled_task_not_spawned() {
        let manager = Arc::new(Manager::new(MapHandler::default()));
        let config = ManagerConfig::new().with_gc_task(false);
        assert!(manager.spawn_gc_task(&config).is_none());
    }

    #[tokio::test]
    async fn test_task_resets_expired_sessions() {
        let handler = MapHandler::default();
        let manager = Arc::new(Manager::new(handler.clone()));
        manager.start("abc").unwrap();
        manager.get("abc").set("n", 7u32).unwrap();

        let config = ManagerConfig::new()
            .with_max_lifetime(Duration::ZERO)
            .with_gc_interval(Duration::from_millis(10));
        let task = manager.spawn_gc_task(&config).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handler.gc_calls.load(Ordering::SeqCst) > 0);
        assert_eq!(manager.get("abc").get::<u32>("n").unwrap(), 0);
        task.abort();
    }

    #[tokio::test]
    async fn test_task_stops_when_manager_dropped() {
        let manager = Arc::new(Manager::new(MapHandler::default()));
        let config = ManagerConfig::new().with_gc_interval(Duration::from_millis(10));
        let task = manager.spawn_gc_task(&config).unwrap();

        drop(manager);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("GC task did not stop")
            .unwrap();
    }
}
