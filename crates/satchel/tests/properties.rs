//! Property-based tests for session get/set behaviour.

use proptest::prelude::*;
use satchel::Manager;
use satchel_handlers::MemoryHandler;

proptest! {
    /// Property: a set value reads back unchanged, before and after a save/restart.
    #[test]
    fn set_then_get_round_trips(
        entries in prop::collection::hash_map("[a-z][a-z0-9_]{0,8}", any::<(i64, String)>(), 1..8)
    ) {
        let handler = MemoryHandler::new();
        let manager = Manager::new(handler.clone());
        manager.start("prop").unwrap();

        let session = manager.get("prop");
        for (key, value) in &entries {
            session.set(key, value.clone()).unwrap();
        }
        for (key, value) in &entries {
            prop_assert_eq!(&session.get::<(i64, String)>(key).unwrap(), value);
        }

        manager.save("prop").unwrap();
        let reopened = Manager::new(handler);
        reopened.start("prop").unwrap();
        let session = reopened.get("prop");
        for (key, value) in &entries {
            prop_assert_eq!(&session.get::<(i64, String)>(key).unwrap(), value);
        }
    }

    /// Property: keys never written read as the default, and stay that way.
    #[test]
    fn unknown_keys_are_default(key in "[a-z]{1,12}") {
        let manager = Manager::new(MemoryHandler::new());
        manager.start("prop").unwrap();
        let session = manager.get("prop");

        prop_assert_eq!(session.get::<Vec<u32>>(&key).unwrap(), Vec::<u32>::new());
        prop_assert_eq!(session.get::<Vec<u32>>(&key).unwrap(), Vec::<u32>::new());
        prop_assert!(session.contains(&key));
    }
}
