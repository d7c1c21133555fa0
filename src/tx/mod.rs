//! Transaction management.
//!
//! The property layer never opens or commits transactions itself. Callers
//! hand a `Transaction` to the `SecurityContext`; writes check that it is a
//! live read-write transaction and report before/after images to its
//! `ModificationQueue`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{EntityId, NodeId, RelId, Value};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// A caller-managed transaction scope.
#[derive(Debug)]
pub struct Transaction {
    id: TxId,
    mode: TxMode,
    open: AtomicBool,
    modifications: ModificationQueue,
}

impl Transaction {
    pub fn begin(mode: TxMode) -> Arc<Self> {
        Arc::new(Self {
            id: TxId(NEXT_TX_ID.fetch_add(1, Ordering::Relaxed)),
            mode,
            open: AtomicBool::new(true),
            modifications: ModificationQueue::default(),
        })
    }

    pub fn id(&self) -> TxId { self.id }
    pub fn mode(&self) -> TxMode { self.mode }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// True while the transaction is open and allows writes.
    pub fn is_write_active(&self) -> bool {
        self.mode == TxMode::ReadWrite && self.is_open()
    }

    /// Closes the scope. Returns the modifications recorded while it was open.
    pub fn finish(&self) -> Vec<Modification> {
        self.open.store(false, Ordering::Release);
        self.modifications.drain()
    }

    pub fn modifications(&self) -> &ModificationQueue {
        &self.modifications
    }
}

/// One before/after pair captured ahead of a write.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub entity: EntityId,
    pub user: Option<String>,
    pub key: String,
    pub previous: Value,
    pub new: Value,
}

/// Change-notification sink of a transaction.
#[derive(Debug, Default)]
pub struct ModificationQueue {
    entries: Mutex<Vec<Modification>>,
}

impl ModificationQueue {
    pub fn node_modified(&self, user: Option<&str>, node: NodeId, key: &str, previous: Value, new: Value) {
        self.push(EntityId::Node(node), user, key, previous, new);
    }

    pub fn relationship_modified(&self, user: Option<&str>, rel: RelId, key: &str, previous: Value, new: Value) {
        self.push(EntityId::Relationship(rel), user, key, previous, new);
    }

    fn push(&self, entity: EntityId, user: Option<&str>, key: &str, previous: Value, new: Value) {
        self.entries.lock().push(Modification {
            entity,
            user: user.map(str::to_owned),
            key: key.to_owned(),
            previous,
            new,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Modification> {
        self.entries.lock().clone()
    }

    fn drain(&self) -> Vec<Modification> {
        std::mem::take(&mut *self.entries.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_closes_scope() {
        let tx = Transaction::begin(TxMode::ReadWrite);
        assert!(tx.is_write_active());
        tx.modifications().node_modified(None, NodeId(1), "name", Value::Null, Value::from("a"));
        let mods = tx.finish();
        assert_eq!(mods.len(), 1);
        assert!(!tx.is_write_active());
    }

    #[test]
    fn test_read_only_tx_is_not_write_active() {
        let tx = Transaction::begin(TxMode::ReadOnly);
        assert!(tx.is_open());
        assert!(!tx.is_write_active());
    }
}
