//! Notifications published to the host.

use web_time::Instant;

use crate::actions::RawEvent;
use crate::execute::ChangeSource;
use crate::model::Entity;
use crate::render_cache::RewriteLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOperation {
    /// The user activated the entity (Enter on a selected entity).
    Click,
    RemoveFromStart,
    RemoveFromEnd,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A keyboard edit is about to be applied by the model instead of the host.
    BeforeKeyboardEditing { raw_event: RawEvent },
    ContentChanged {
        source: ChangeSource,
        raw_event: Option<RawEvent>,
        /// Render-tree block elements added and removed by the resync.
        ledger: RewriteLedger,
        timestamp: Instant,
    },
    EntityOperation {
        operation: EntityOperation,
        entity: Entity,
        raw_event: Option<RawEvent>,
    },
}

/// Receiver of editor notifications.
pub trait NotificationSink {
    fn publish(&mut self, notification: Notification);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &mut T {
    fn publish(&mut self, notification: Notification) {
        (**self).publish(notification)
    }
}

/// Sink that keeps every notification, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_operations(&self) -> impl Iterator<Item = (&EntityOperation, &Entity)> {
        self.notifications.iter().filter_map(|n| match n {
            Notification::EntityOperation {
                operation, entity, ..
            } => Some((operation, entity)),
            _ => None,
        })
    }

    pub fn count_before_keyboard_editing(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| matches!(n, Notification::BeforeKeyboardEditing { .. }))
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&mut self, notification: Notification) {
        tracing::trace!(target: "trellis::editor", ?notification, "notification");
        self.notifications.push(notification);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&mut self, _notification: Notification) {}
}
