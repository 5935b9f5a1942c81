//! `SerializationCtx`: the hand-off bookkeeping described in §4.8 —
//! "records up-stream queues holding an item; when it is destroyed, it
//! releases them in order, so an item that crosses queues remains
//! serialized against its originating queue until the work completes on
//! the last queue."

use crate::task::Reservation;
use std::fmt;

/// Tracks the [`Reservation`]s an in-flight item currently holds across the
/// queues it has crossed, in hand-off order, and releases them in that
/// order on drop (each [`Reservation`]'s own `Drop` unreserves its queue).
#[derive(Default)]
pub struct SerializationCtx {
    held: Vec<Reservation>,
}

impl fmt::Debug for SerializationCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationCtx")
            .field("held_queues", &self.held.len())
            .finish()
    }
}

impl SerializationCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that this item now holds `reservation`'s slot. Call once per
    /// queue, in the order the item was handed off across them.
    pub fn hold(&mut self, reservation: Reservation) {
        self.held.push(reservation);
    }

    pub fn held_queues(&self) -> usize {
        self.held.len()
    }
}

// `Drop` is derived implicitly through `Vec<Reservation>`'s own element
// drops, which run front-to-back — i.e. in the order queues were recorded.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{JobQueue, ThreadPoolJobQueue, WorkQueue};
    use std::sync::Arc;

    #[test]
    fn drop_releases_every_held_queue_in_order() {
        let pool = ThreadPoolJobQueue::new("ser-ctx-pool", 1);
        let metrics = metric::Registry::new();
        let a = WorkQueue::new("a", Arc::clone(&pool) as Arc<dyn JobQueue>, 1, 1, &metrics);
        let b = WorkQueue::new("b", pool, 1, 1, &metrics);

        // The item holds a's slot, then hands off to b without a's slot
        // being released yet.
        let reservation_a = a.reserve().unwrap();
        let reservation_b = b.reserve().unwrap();

        assert!(a.reserve().is_err());
        assert!(b.reserve().is_err());

        {
            let mut ctx = SerializationCtx::new();
            ctx.hold(reservation_a);
            ctx.hold(reservation_b);
            assert_eq!(ctx.held_queues(), 2);
            assert!(a.reserve().is_err(), "still held while ctx is alive");
        }

        assert!(a.reserve().is_ok());
        assert!(b.reserve().is_ok());
    }
}
