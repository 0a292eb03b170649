use std::sync::{Arc, Weak};

use dashmap::{DashMap, mapref::entry::Entry};
use once_cell::sync::Lazy;

use crate::val::table::TableValue;

use super::{BoundMethodValue, Val};

/// Cache key: receiver identity (its allocation address) plus method name.
/// Identity, not structural equality: two structurally equal tables must not
/// share an entry.
#[derive(Clone, PartialEq, Eq, Hash)]
struct BoundKey {
    receiver: usize,
    method: Arc<str>,
}

/// Entries hold `Weak` references so the cache never keeps a bound closure
/// (and, through it, its receiver) alive. While any script value holds the
/// closure, repeated evaluations observe the identical value; afterwards the
/// entry goes dead and is swept.
static BOUND_CACHE: Lazy<DashMap<BoundKey, Weak<BoundMethodValue>>> = Lazy::new(DashMap::new);

fn receiver_key(table: &Arc<TableValue>) -> usize {
    Arc::as_ptr(table) as *const () as usize
}

fn cleanup_cache() {
    BOUND_CACHE.retain(|_, entry| entry.upgrade().is_some());
}

/// `get_or_create` for the bound-closure cache.
///
/// Aliasing across address reuse is not possible on a hit: an upgradeable
/// entry means the old closure is alive and pins its receiver's allocation,
/// so a different table cannot occupy the keyed address.
pub(super) fn bound_method(receiver: &Arc<TableValue>, method: &Arc<str>) -> Arc<BoundMethodValue> {
    let key = BoundKey {
        receiver: receiver_key(receiver),
        method: method.clone(),
    };

    if let Some(entry) = BOUND_CACHE.get(&key) {
        if let Some(existing) = entry.value().upgrade() {
            tracing::trace!(method = %method, "bound-method cache hit");
            return existing;
        }
    }

    let created = Arc::new(BoundMethodValue {
        receiver: Val::Table(receiver.clone()),
        name: method.clone(),
    });

    cleanup_cache();
    match BOUND_CACHE.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(Arc::downgrade(&created));
            created
        }
        Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
            // Another thread created the canonical closure in between.
            Some(existing) => existing,
            None => {
                occupied.insert(Arc::downgrade(&created));
                created
            }
        },
    }
}

#[cfg(test)]
mod cache_tests {
    use std::sync::Arc;

    use super::*;

    fn table() -> Arc<TableValue> {
        Arc::new(TableValue::new())
    }

    #[test]
    fn repeated_requests_yield_the_same_closure() {
        let t = table();
        let name: Arc<str> = Arc::from("m");

        let a = bound_method(&t, &name);
        let b = bound_method(&t, &name);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_receivers_and_names_get_distinct_closures() {
        let t1 = table();
        let t2 = table();
        let m: Arc<str> = Arc::from("m");
        let n: Arc<str> = Arc::from("n");

        let a = bound_method(&t1, &m);
        let b = bound_method(&t2, &m);
        let c = bound_method(&t1, &n);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn cache_does_not_retain_receiver() {
        let t = table();
        let weak_receiver = Arc::downgrade(&t);
        let name: Arc<str> = Arc::from("m");

        let bound = bound_method(&t, &name);
        drop(t);
        // The closure itself still pins the receiver.
        assert!(weak_receiver.upgrade().is_some());

        drop(bound);
        // Nothing left but the cache's weak entry; the receiver is gone.
        assert!(weak_receiver.upgrade().is_none());
    }

    #[test]
    fn dead_entries_are_replaced_not_resurrected() {
        let t = table();
        let name: Arc<str> = Arc::from("gone");

        let first = bound_method(&t, &name);
        let first_ptr = Arc::as_ptr(&first);
        drop(first);

        let second = bound_method(&t, &name);
        // A fresh closure was built; the dead entry was not revived. The new
        // allocation may or may not reuse the address, so assert on identity
        // semantics instead: the entry upgrades to the new closure.
        let third = bound_method(&t, &name);
        assert!(Arc::ptr_eq(&second, &third));
        let _ = first_ptr;
    }
}
