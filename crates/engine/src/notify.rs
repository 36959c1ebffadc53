//! Keyspace notifications: an internal callback hook, not a second
//! pub/sub tier (§9 supplement). Every mutating command can report what it
//! did; the server turns that into a synthetic `PUBLISH` on
//! `__keyspace@<db>__:<key>` and `__keyevent@<db>__:<event>` only if a
//! sink is actually wired up, so the cost is zero for embeddings that
//! don't care.

/// One keyspace event: database index, the key it happened to, and the
/// event name (`"set"`, `"expire"`, `"del"`, `"lpush"`, ...).
#[derive(Debug, Clone)]
pub struct Notification {
    /// Logical database the event occurred in.
    pub db: usize,
    /// The key that was touched.
    pub key: Vec<u8>,
    /// Event name, matching Redis's `notify-keyspace-events` vocabulary.
    pub event: &'static str,
}

/// Receives keyspace notifications as they happen. The default impl is a
/// no-op, so wiring one up is opt-in.
pub trait NotificationSink: Send + Sync {
    /// Called once per notification, synchronously with the mutation that
    /// produced it.
    fn notify(&self, event: Notification);
}

/// A sink that discards every notification — the default when nothing
/// else is configured.
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _event: Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<Notification>>);

    impl NotificationSink for RecordingSink {
        fn notify(&self, event: Notification) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn noop_sink_drops_everything() {
        let sink = NoopSink;
        sink.notify(Notification {
            db: 0,
            key: b"k".to_vec(),
            event: "set",
        });
    }

    #[test]
    fn a_custom_sink_observes_events_in_order() {
        let sink = RecordingSink(Mutex::new(Vec::new()));
        sink.notify(Notification {
            db: 0,
            key: b"a".to_vec(),
            event: "set",
        });
        sink.notify(Notification {
            db: 0,
            key: b"a".to_vec(),
            event: "expire",
        });
        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].event, "set");
        assert_eq!(seen[1].event, "expire");
    }
}
