use tokio::sync::broadcast;
use tracing::trace;

use skillmatch_types::events::{Change, ChangeOp, Table};

/// Single fan-out point for the change feed. Every successful mutation
/// publishes one `Change` per touched table; each gateway connection holds
/// a broadcast receiver and filters against its own subscription list.
#[derive(Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<Change>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Subscribe to the change feed. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }

    /// Publish a committed change. Lossy when no connection is listening
    /// or when a receiver lags; consumers refetch, so a dropped
    /// notification only delays convergence until the next one.
    pub fn publish(&self, table: Table, op: ChangeOp) {
        let change = Change { table, op };
        trace!(?change, "change published");
        let _ = self.tx.send(change);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_changes() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish(Table::Messages, ChangeOp::Insert);
        dispatcher.publish(Table::Profiles, ChangeOp::Update);

        assert_eq!(
            rx.recv().await.unwrap(),
            Change {
                table: Table::Messages,
                op: ChangeOp::Insert
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Change {
                table: Table::Profiles,
                op: ChangeOp::Update
            }
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        dispatcher.publish(Table::Projects, ChangeOp::Delete);

        // A receiver opened afterwards only sees subsequent changes.
        let mut rx = dispatcher.subscribe();
        dispatcher.publish(Table::Projects, ChangeOp::Insert);
        assert_eq!(
            rx.recv().await.unwrap().op,
            ChangeOp::Insert
        );
    }
}
