//! Datasource selections pushed onto a request context.
//!
//! Every push hands back a [`SelectionTicket`] that names one entry on one
//! stack. Releasing the ticket removes that entry only, so selections can be
//! undone in any order and from any task without disturbing the others.

use core::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Type-erased pool kept with a selection. The router that pushed it knows
/// the concrete type and reads it back with [`DataSourceSelection::pool`].
pub type PoolHandle = Arc<dyn Any + Send + Sync>;

static NEXT_SELECTION: AtomicU64 = AtomicU64::new(1);

/// One entry of the selection stack.
#[derive(Clone)]
pub struct DataSourceSelection {
    id: u64,
    key: String,
    pool: Option<PoolHandle>,
}

impl DataSourceSelection {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The pool captured when the datasource was selected, if it has type `P`.
    pub fn pool<P: Any + Clone>(&self) -> Option<P> {
        self.pool.as_ref()?.downcast_ref::<P>().cloned()
    }
}

impl core::fmt::Debug for DataSourceSelection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataSourceSelection")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("has_pool", &self.pool.is_some())
            .finish()
    }
}

type Entries = Mutex<Vec<DataSourceSelection>>;

/// Bottom-first stack of selections owned by a single context instance.
#[derive(Debug, Default)]
pub(crate) struct SelectionStack {
    entries: Arc<Entries>,
}

impl SelectionStack {
    fn lock(&self) -> MutexGuard<'_, Vec<DataSourceSelection>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, key: String, pool: Option<PoolHandle>) -> SelectionTicket {
        let id = NEXT_SELECTION.fetch_add(1, Ordering::Relaxed);
        self.lock().push(DataSourceSelection {
            id,
            key: key.clone(),
            pool,
        });
        SelectionTicket {
            id,
            key,
            stack: Arc::downgrade(&self.entries),
        }
    }

    pub(crate) fn pop(&self) -> Option<DataSourceSelection> {
        self.lock().pop()
    }

    pub(crate) fn top(&self) -> Option<DataSourceSelection> {
        self.lock().last().cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|s| s.key.clone()).collect()
    }

    /// Independent copy: tickets issued for `self` never touch the copy.
    pub(crate) fn snapshot(&self) -> Self {
        Self {
            entries: Arc::new(Mutex::new(self.lock().clone())),
        }
    }
}

/// Receipt for one push. Does nothing when dropped; see [`SelectionTicket::release`].
#[derive(Debug)]
pub struct SelectionTicket {
    id: u64,
    key: String,
    stack: Weak<Entries>,
}

impl SelectionTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove this ticket's entry from the stack it was pushed on, wherever
    /// that entry sits and whichever task calls this. Returns `false` when
    /// the entry is already gone or its context has ended.
    pub fn release(&self) -> bool {
        let Some(entries) = self.stack.upgrade() else {
            return false;
        };
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.iter().rposition(|s| s.id == self.id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_removes_exactly_its_own_entry() {
        let stack = SelectionStack::default();
        let five = stack.push("5".into(), Some(Arc::new(50u32)));
        let six = stack.push("6".into(), Some(Arc::new(60u32)));

        assert!(five.release());
        assert_eq!(stack.keys(), vec!["6".to_string()]);
        assert_eq!(stack.top().and_then(|s| s.pool::<u32>()), Some(60));

        assert!(!five.release());
        assert!(six.release());
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn snapshot_is_not_affected_by_tickets_of_the_original() {
        let stack = SelectionStack::default();
        let ticket = stack.push("5".into(), None);
        let copy = stack.snapshot();

        assert!(ticket.release());
        assert_eq!(stack.len(), 0);
        assert_eq!(copy.keys(), vec!["5".to_string()]);
    }

    #[test]
    fn ticket_outliving_its_stack_releases_nothing() {
        let stack = SelectionStack::default();
        let ticket = stack.push("5".into(), None);
        drop(stack);
        assert!(!ticket.release());
    }

    #[test]
    fn pool_of_another_type_reads_as_none() {
        let stack = SelectionStack::default();
        let _ticket = stack.push("5".into(), Some(Arc::new("pool".to_string())));
        let top = stack.top().unwrap();
        assert_eq!(top.pool::<String>().as_deref(), Some("pool"));
        assert_eq!(top.pool::<u32>(), None);
    }
}
