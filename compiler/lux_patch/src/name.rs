//! Interned names for block types, ports, and domains.
//!
//! A patch has dozens of names, not millions, so this is a single-table
//! interner behind one `RwLock` rather than a sharded one. Names are 32-bit
//! ids: O(1) equality and hashing, cheap copies into every schema and edge.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use lux_types::define_id;

define_id! {
    /// Interned name id.
    Name
}

#[derive(Default)]
struct Table {
    map: FxHashMap<String, Name>,
    strings: Vec<String>,
}

/// Interner storage. Usually handled through the shared [`Names`] handle.
#[derive(Default)]
pub struct NameInterner {
    table: RwLock<Table>,
}

impl NameInterner {
    pub fn new() -> Self {
        NameInterner::default()
    }

    /// Intern a string, returning its stable id.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&name) = self.table.read().map.get(s) {
            return name;
        }
        let mut table = self.table.write();
        if let Some(&name) = table.map.get(s) {
            return name;
        }
        let name = Name::new(u32::try_from(table.strings.len()).unwrap_or(u32::MAX));
        table.strings.push(s.to_owned());
        table.map.insert(s.to_owned(), name);
        name
    }

    /// Look up a name's string. Unknown ids render as `<name#N>`.
    pub fn lookup(&self, name: Name) -> String {
        self.table
            .read()
            .strings
            .get(name.index())
            .cloned()
            .unwrap_or_else(|| format!("<name#{}>", name.raw()))
    }

    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to a name interner.
///
/// The patch and the registry must intern against the same table so that a
/// port name mentioned in an edge resolves to the same id as the schema's.
#[derive(Clone, Default)]
pub struct Names {
    inner: Arc<NameInterner>,
}

impl Names {
    pub fn new() -> Self {
        Names::default()
    }

    pub fn intern(&self, s: &str) -> Name {
        self.inner.intern(s)
    }

    pub fn lookup(&self, name: Name) -> String {
        self.inner.lookup(name)
    }
}

impl std::fmt::Debug for Names {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Names({} interned)", self.inner.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let names = Names::new();
        let a = names.intern("Mul");
        let b = names.intern("Mul");
        let c = names.intern("Add");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(names.lookup(a), "Mul");
        assert_eq!(names.lookup(c), "Add");
    }

    #[test]
    fn unknown_names_render_placeholder() {
        let names = Names::new();
        assert_eq!(names.lookup(Name::new(99)), "<name#99>");
    }

    #[test]
    fn shared_handles_see_one_table() {
        let names = Names::new();
        let other = names.clone();
        let a = names.intern("out");
        assert_eq!(other.intern("out"), a);
    }
}
