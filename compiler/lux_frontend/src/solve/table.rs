//! Generic union-find over axis variables.
//!
//! One table per axis domain: cardinality shape, instance, unit, payload,
//! temporality, binding, perspective, branch all go through the same
//! machinery, so extending an axis enum never touches the solver core.
//!
//! Link-based with path compression: O(α(n)) amortized per operation.
//! Concrete values are merged into groups as they arrive; a union that would
//! join two distinct concrete values refuses to merge and reports the pair,
//! leaving both groups intact so the caller can record a diagnostic and keep
//! going.

use std::marker::PhantomData;

/// Typed key into a [`VarTable`].
pub trait VarKey: Copy {
    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;
}

macro_rules! impl_var_key {
    ($($ty:ty),* $(,)?) => {
        $(impl VarKey for $ty {
            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self::new(raw)
            }

            #[inline]
            fn raw(self) -> u32 {
                Self::raw(self)
            }
        })*
    };
}

impl_var_key!(
    lux_types::CardinalityVar,
    lux_types::InstanceVar,
    lux_types::TemporalityVar,
    lux_types::BindingVar,
    lux_types::PerspectiveVar,
    lux_types::BranchVar,
    lux_types::UnitVar,
    lux_types::PayloadVar,
);

/// Union-find with per-group concrete values.
#[derive(Debug)]
pub struct VarTable<K, V> {
    parent: Vec<u32>,
    value: Vec<Option<V>>,
    _key: PhantomData<K>,
}

impl<K: VarKey, V: Clone + PartialEq> VarTable<K, V> {
    pub fn new() -> Self {
        VarTable {
            parent: Vec::new(),
            value: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Allocate a fresh unconstrained variable.
    pub fn fresh(&mut self) -> K {
        let raw = u32::try_from(self.parent.len()).unwrap_or(u32::MAX);
        self.parent.push(raw);
        self.value.push(None);
        K::from_raw(raw)
    }

    fn find(&mut self, raw: u32) -> u32 {
        let mut root = raw;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Path compression.
        let mut cursor = raw;
        while self.parent[cursor as usize] != root {
            let next = self.parent[cursor as usize];
            self.parent[cursor as usize] = root;
            cursor = next;
        }
        root
    }

    /// Merge a concrete value into a variable's group.
    ///
    /// Returns the conflicting pair `(existing, incoming)` if the group
    /// already holds a different concrete value; the group keeps its value.
    pub fn assign(&mut self, key: K, value: V) -> Result<(), (V, V)> {
        let root = self.find(key.raw()) as usize;
        match &self.value[root] {
            Some(existing) if *existing != value => Err((existing.clone(), value)),
            _ => {
                self.value[root] = Some(value);
                Ok(())
            }
        }
    }

    /// Merge two variables' groups.
    ///
    /// If both groups hold distinct concrete values, the merge is refused and
    /// the pair `(left, right)` is returned with both groups intact.
    pub fn union(&mut self, a: K, b: K) -> Result<(), (V, V)> {
        let ra = self.find(a.raw());
        let rb = self.find(b.raw());
        if ra == rb {
            return Ok(());
        }
        match (&self.value[ra as usize], &self.value[rb as usize]) {
            (Some(left), Some(right)) if left != right => {
                return Err((left.clone(), right.clone()));
            }
            _ => {}
        }
        // Keep the concrete value on the surviving root.
        let merged = self.value[ra as usize]
            .clone()
            .or_else(|| self.value[rb as usize].clone());
        self.parent[rb as usize] = ra;
        self.value[ra as usize] = merged;
        self.value[rb as usize] = None;
        Ok(())
    }

    /// The group's concrete value, if any.
    pub fn value(&mut self, key: K) -> Option<V> {
        let root = self.find(key.raw()) as usize;
        self.value[root].clone()
    }

    /// Whether two variables are in one group.
    pub fn same_group(&mut self, a: K, b: K) -> bool {
        self.find(a.raw()) == self.find(b.raw())
    }

    /// The group's representative, for per-group deduplication of reports.
    pub fn root(&mut self, key: K) -> u32 {
        self.find(key.raw())
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

impl<K: VarKey, V: Clone + PartialEq> Default for VarTable<K, V> {
    fn default() -> Self {
        VarTable::new()
    }
}
