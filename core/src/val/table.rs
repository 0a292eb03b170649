use std::fmt;
use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow};

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

use super::values::Val;

/// A raw table key. Lua-style: any non-nil scalar; float keys with an exact
/// integer value collapse onto the integer key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
}

impl TableKey {
    pub fn from_val(v: &Val) -> Option<TableKey> {
        match v {
            Val::Int(i) => Some(TableKey::Int(*i)),
            Val::Bool(b) => Some(TableKey::Bool(*b)),
            Val::Str(s) => Some(TableKey::Str(s.clone())),
            Val::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(TableKey::Int(*x as i64)),
            _ => None,
        }
    }
}

/// An identity-carrying, mutable table with an optional metatable.
///
/// Tables are always handled through `Arc<TableValue>`; the `Arc` allocation
/// address is the table's identity (used for equality and as the
/// bound-method cache key).
pub struct TableValue {
    entries: RwLock<FastHashMap<TableKey, Val>>,
    metatable: RwLock<Option<Arc<TableValue>>>,
}

impl TableValue {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(fast_hash_map_new()),
            metatable: RwLock::new(None),
        }
    }

    /// Raw read: no metamethods. Returns `None` for absent entries and for
    /// keys no table can hold (nil, NaN, aggregates).
    pub fn raw_get(&self, key: &Val) -> Option<Val> {
        let key = TableKey::from_val(key)?;
        self.entries.read().unwrap().get(&key).cloned()
    }

    pub fn raw_get_str(&self, name: &str) -> Option<Val> {
        self.entries
            .read()
            .unwrap()
            .get(&TableKey::Str(Arc::from(name)))
            .cloned()
    }

    /// Raw write: no metamethods. Writing nil removes the entry.
    pub fn raw_set(&self, key: &Val, value: Val) -> Result<()> {
        let key = match key {
            Val::Nil => return Err(anyhow!("table index is nil")),
            Val::Float(x) if x.is_nan() => return Err(anyhow!("table index is NaN")),
            other => TableKey::from_val(other)
                .ok_or_else(|| anyhow!("invalid table key ({} value)", other.type_name()))?,
        };
        self.insert(key, value);
        Ok(())
    }

    pub fn insert(&self, key: TableKey, value: Val) {
        let mut entries = self.entries.write().unwrap();
        if matches!(value, Val::Nil) {
            entries.remove(&key);
        } else {
            entries.insert(key, value);
        }
    }

    pub fn insert_str(&self, name: &str, value: Val) {
        self.insert(TableKey::Str(Arc::from(name)), value);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    pub fn metatable(&self) -> Option<Arc<TableValue>> {
        self.metatable.read().unwrap().clone()
    }

    pub fn set_metatable(&self, mt: Option<Arc<TableValue>>) {
        *self.metatable.write().unwrap() = mt;
    }

    /// Read a metamethod slot, treating a stored nil as absent.
    pub fn meta_field(&self, name: &str) -> Option<Val> {
        let mt = self.metatable()?;
        match mt.raw_get_str(name) {
            Some(Val::Nil) | None => None,
            Some(v) => Some(v),
        }
    }
}

impl Default for TableValue {
    fn default() -> Self {
        Self::new()
    }
}

// Tables can be cyclic (t.self = t); Debug stays shallow.
impl fmt::Debug for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table: {:#x}", self as *const TableValue as usize)
    }
}
