use crate::coordinator::CoordinatorInner;
use crate::{Coordinator, EntryId};

use std::sync::Weak;

/// Membership of a socket in the coordinator's registry.
///
/// Dropping the registration (or calling [`SocketRegistration::closed`]) is
/// the socket's one-time close notification: the socket is deregistered and
/// will not be closed by a later drain.
#[derive(Debug)]
#[must_use = "dropping the registration deregisters the socket immediately"]
pub struct SocketRegistration {
    id: EntryId,
    coordinator: Weak<CoordinatorInner>,
}

impl SocketRegistration {
    pub(crate) fn new(id: EntryId, coordinator: Weak<CoordinatorInner>) -> Self {
        Self { id, coordinator }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Report that the socket has closed on its own
    pub fn closed(self) {
        drop(self);
    }
}

impl Drop for SocketRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.coordinator.upgrade() {
            Coordinator::from_inner(inner).remove_socket(self.id);
        }
    }
}
