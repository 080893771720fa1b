//! Inbox shared between the background session and the caller

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

use super::SessionState;
use crate::types::MessageRecord;

/// Records appended by the session thread, drained by the caller.
///
/// The lock is held only for a single push or a swap, so the background
/// side never waits on caller-side processing.
#[derive(Debug, Default)]
pub(crate) struct Inbox {
    records: Mutex<Vec<MessageRecord>>,
    state: AtomicU8,
}

impl Inbox {
    pub(crate) fn push(&self, record: MessageRecord) {
        self.records.lock().push(record);
    }

    /// Take everything appended so far, leaving the inbox empty.
    pub(crate) fn drain(&self) -> Vec<MessageRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_empties_the_inbox() {
        let inbox = Inbox::default();
        inbox.push(MessageRecord::received("a", "1"));
        inbox.push(MessageRecord::received("b", "2"));

        let drained = inbox.drain();
        assert_eq!(drained.iter().map(|r| r.topic.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn concurrent_appends_and_drains_lose_nothing() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 2_000;

        let inbox = Arc::new(Inbox::default());
        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let inbox = Arc::clone(&inbox);
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        inbox.push(MessageRecord::received(format!("{w}"), format!("{i}")));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while writers.iter().any(|w| !w.is_finished()) {
            seen.extend(inbox.drain());
        }
        for writer in writers {
            writer.join().unwrap();
        }
        seen.extend(inbox.drain());

        assert_eq!(seen.len(), WRITERS * PER_WRITER);
        let unique: BTreeSet<(String, String)> =
            seen.iter().map(|r| (r.topic.clone(), r.payload_str().unwrap().to_string())).collect();
        assert_eq!(unique.len(), WRITERS * PER_WRITER);

        // each writer's records stay in append order
        for w in 0..WRITERS {
            let order: Vec<usize> = seen
                .iter()
                .filter(|r| r.topic == w.to_string())
                .map(|r| r.payload_str().unwrap().parse().unwrap())
                .collect();
            assert!(order.windows(2).all(|p| p[0] < p[1]));
        }
    }
}
