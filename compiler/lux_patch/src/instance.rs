//! The instance table: which domain instantiations exist in a compilation.
//!
//! Instance-creating blocks (declared via `BlockSpec::instance_domain`)
//! register here during solving. An [`lux_types::InstanceRef`] is valid only
//! if this table knows it; the axis validator checks every `many` against it.

use rustc_hash::FxHashMap;

use lux_types::{DomainId, InstanceId, InstanceRef};

use crate::block::BlockId;
use crate::name::Name;

/// One registered instantiation of a domain.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceInfo {
    pub instance: InstanceRef,
    pub domain_name: Name,
    /// Lane count of this instantiation.
    pub count: u32,
    /// The block that created it.
    pub origin: BlockId,
}

/// All domain instantiations of one compilation.
#[derive(Debug, Default)]
pub struct InstanceTable {
    domains: Vec<Name>,
    domain_ids: FxHashMap<Name, DomainId>,
    infos: Vec<InstanceInfo>,
}

impl InstanceTable {
    pub fn new() -> Self {
        InstanceTable::default()
    }

    fn domain_id(&mut self, domain_name: Name) -> DomainId {
        if let Some(&id) = self.domain_ids.get(&domain_name) {
            return id;
        }
        let id = DomainId::new(u32::try_from(self.domains.len()).unwrap_or(u32::MAX));
        self.domains.push(domain_name);
        self.domain_ids.insert(domain_name, id);
        id
    }

    /// Register an instantiation; instance ids are dense over the table.
    pub fn register(&mut self, domain_name: Name, count: u32, origin: BlockId) -> InstanceRef {
        let domain = self.domain_id(domain_name);
        let instance = InstanceRef::new(
            domain,
            InstanceId::new(u32::try_from(self.infos.len()).unwrap_or(u32::MAX)),
        );
        self.infos.push(InstanceInfo {
            instance,
            domain_name,
            count,
            origin,
        });
        instance
    }

    /// Whether the table knows this exact instance.
    pub fn contains(&self, instance: InstanceRef) -> bool {
        self.info(instance).is_some()
    }

    pub fn info(&self, instance: InstanceRef) -> Option<&InstanceInfo> {
        self.infos
            .get(instance.instance.index())
            .filter(|info| info.instance == instance)
    }

    /// Lane count of an instance.
    pub fn count_of(&self, instance: InstanceRef) -> Option<u32> {
        self.info(instance).map(|info| info.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceInfo> {
        self.infos.iter()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_assigns_dense_ids() {
        let mut table = InstanceTable::new();
        let circles = Name::new(0);
        let squares = Name::new(1);

        let a = table.register(circles, 10, BlockId::new(0));
        let b = table.register(circles, 3, BlockId::new(1));
        let c = table.register(squares, 7, BlockId::new(2));

        // Same domain, distinct instances.
        assert_eq!(a.domain, b.domain);
        assert_ne!(a.instance, b.instance);
        assert_ne!(a.domain, c.domain);

        assert_eq!(table.count_of(a), Some(10));
        assert_eq!(table.count_of(b), Some(3));
        assert_eq!(table.count_of(c), Some(7));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn mismatched_refs_are_unknown() {
        let mut table = InstanceTable::new();
        let circles = Name::new(0);
        let a = table.register(circles, 10, BlockId::new(0));
        assert!(table.contains(a));

        // Right instance index, wrong domain.
        let forged = InstanceRef::new(DomainId::new(9), a.instance);
        assert!(!table.contains(forged));
        assert_eq!(table.count_of(forged), None);
    }
}
