//! Class table: hierarchy, registry roots, and declared relations.
//!
//! A class either roots a new registry or shares its parent's, so a
//! subclass instance is discoverable through every ancestor that shares
//! the root. Relations are inherited; a subclass may shadow a name.

use std::collections::HashMap;
use std::rc::Rc;

use lig_core::errors::CoreError;
use lig_core::relation::{RelationDescriptor, RelationSet};

use crate::error::GraphError;

/// Handle to a class declared on a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

/// Declaration of a new class.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    name: String,
    parent: Option<ClassId>,
    own_registry: bool,
    cid_attribute: Option<String>,
}

impl ClassSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            own_registry: false,
            cid_attribute: None,
        }
    }

    /// Inherit relations and, unless [`ClassSpec::own_registry`] is set,
    /// the registry of `parent`.
    #[must_use]
    pub const fn extends(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub const fn own_registry(mut self) -> Self {
        self.own_registry = true;
        self
    }

    #[must_use]
    pub fn cid_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.cid_attribute = Some(attribute.into());
        self
    }
}

/// Relation descriptor bound to its resolved target class.
#[derive(Debug, Clone)]
pub(crate) struct BoundRelation {
    pub(crate) descriptor: RelationDescriptor,
    pub(crate) target: ClassId,
    pub(crate) foreign_key: String,
}

impl BoundRelation {
    pub(crate) fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn inverse(&self) -> Option<&str> {
        self.descriptor.inverse.as_deref()
    }

    pub(crate) fn raw_key(&self) -> &str {
        self.descriptor.raw_key()
    }

    pub(crate) const fn is_one(&self) -> bool {
        self.descriptor.is_one()
    }

    pub(crate) const fn is_many(&self) -> bool {
        self.descriptor.is_many()
    }
}

pub(crate) struct ClassDef {
    pub(crate) name: String,
    parent: Option<ClassId>,
    root: ClassId,
    cid_attribute: Option<String>,
    declared: RelationSet,
    bound: Vec<Rc<BoundRelation>>,
}

#[derive(Default)]
pub(crate) struct ClassTable {
    defs: Vec<ClassDef>,
    by_name: HashMap<String, ClassId>,
}

impl ClassTable {
    pub(crate) fn declare(&mut self, spec: ClassSpec) -> Result<ClassId, GraphError> {
        if spec.name.is_empty() {
            return Err(CoreError::EmptyName { what: "class" }.into());
        }
        if self.by_name.contains_key(&spec.name) {
            return Err(GraphError::DuplicateClass(spec.name));
        }
        if let Some(parent) = spec.parent {
            self.check(parent)?;
        }

        let id = ClassId(self.defs.len());
        let root = match spec.parent {
            Some(parent) if !spec.own_registry => self.root(parent),
            _ => id,
        };
        self.by_name.insert(spec.name.clone(), id);
        self.defs.push(ClassDef {
            declared: RelationSet::new(spec.name.clone()),
            name: spec.name,
            parent: spec.parent,
            root,
            cid_attribute: spec.cid_attribute,
            bound: Vec::new(),
        });
        Ok(id)
    }

    pub(crate) fn check(&self, id: ClassId) -> Result<(), GraphError> {
        if id.0 < self.defs.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownClass(format!("#{}", id.0)))
        }
    }

    pub(crate) fn add_relation(
        &mut self,
        id: ClassId,
        descriptor: RelationDescriptor,
    ) -> Result<Rc<BoundRelation>, GraphError> {
        self.check(id)?;
        let target = self
            .id_of(&descriptor.target)
            .ok_or_else(|| GraphError::UnknownClass(descriptor.target.clone()))?;
        let def = &mut self.defs[id.0];
        def.declared.push(descriptor.clone())?;
        let bound = Rc::new(BoundRelation {
            foreign_key: descriptor.foreign_key(),
            descriptor,
            target,
        });
        def.bound.push(Rc::clone(&bound));
        Ok(bound)
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn def(&self, id: ClassId) -> &ClassDef {
        &self.defs[id.0]
    }

    pub(crate) fn name(&self, id: ClassId) -> &str {
        &self.def(id).name
    }

    pub(crate) fn root(&self, id: ClassId) -> ClassId {
        self.def(id).root
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.defs.len()).map(ClassId)
    }

    /// Leaf-to-root chain starting at `id`.
    fn chain(&self, id: ClassId) -> impl Iterator<Item = &ClassDef> + '_ {
        std::iter::successors(Some(self.def(id)), |def| def.parent.map(|p| self.def(p)))
    }

    pub(crate) fn is_a(&self, id: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(id);
        while let Some(class) = current {
            if class == ancestor {
                return true;
            }
            current = self.def(class).parent;
        }
        false
    }

    /// Nearest declaration of `name` along the chain.
    pub(crate) fn relation(&self, id: ClassId, name: &str) -> Option<Rc<BoundRelation>> {
        self.chain(id)
            .find_map(|def| def.bound.iter().find(|r| r.name() == name))
            .cloned()
    }

    /// Effective relations of `id`, ancestors first, in declaration order.
    pub(crate) fn relations(&self, id: ClassId) -> Vec<Rc<BoundRelation>> {
        let mut defs: Vec<&ClassDef> = self.chain(id).collect();
        defs.reverse();
        let mut out: Vec<Rc<BoundRelation>> = Vec::new();
        for def in defs {
            for rel in &def.bound {
                match out.iter().position(|r| r.name() == rel.name()) {
                    Some(i) => out[i] = Rc::clone(rel),
                    None => out.push(Rc::clone(rel)),
                }
            }
        }
        out
    }

    pub(crate) fn cid_attribute<'a>(&'a self, id: ClassId, default: &'a str) -> &'a str {
        self.chain(id)
            .find_map(|def| def.cid_attribute.as_deref())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (ClassTable, ClassId, ClassId, ClassId) {
        let mut table = ClassTable::default();
        let user = table.declare(ClassSpec::new("User")).unwrap();
        let admin = table
            .declare(ClassSpec::new("Admin").extends(user).cid_attribute("_cid"))
            .unwrap();
        let settings = table.declare(ClassSpec::new("Settings")).unwrap();
        (table, user, admin, settings)
    }

    #[test]
    fn subclasses_share_their_parent_root() {
        let (mut table, user, admin, settings) = table();
        assert_eq!(table.root(admin), user);
        assert_eq!(table.root(settings), settings);

        let guest = table
            .declare(ClassSpec::new("Guest").extends(user).own_registry())
            .unwrap();
        assert_eq!(table.root(guest), guest);
        assert!(table.is_a(guest, user));
        assert!(!table.is_a(user, guest));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let (mut table, ..) = table();
        assert!(matches!(
            table.declare(ClassSpec::new("User")),
            Err(GraphError::DuplicateClass(_))
        ));
        assert!(matches!(
            table.declare(ClassSpec::new("")),
            Err(GraphError::Core(CoreError::EmptyName { .. }))
        ));
    }

    #[test]
    fn relations_are_inherited_and_shadowed() {
        let (mut table, user, admin, _) = table();
        table
            .add_relation(user, RelationDescriptor::one("settings", "Settings"))
            .unwrap();
        table
            .add_relation(user, RelationDescriptor::many("contacts", "User"))
            .unwrap();
        table
            .add_relation(admin, RelationDescriptor::many("contacts", "Admin"))
            .unwrap();

        let names: Vec<String> = table
            .relations(admin)
            .iter()
            .map(|r| format!("{}->{}", r.name(), r.descriptor.target))
            .collect();
        assert_eq!(names, ["settings->Settings", "contacts->Admin"]);
        assert_eq!(table.relation(admin, "settings").unwrap().foreign_key, "settings_id");
        assert!(table.relation(user, "missing").is_none());
    }

    #[test]
    fn unknown_target_is_rejected() {
        let (mut table, user, ..) = table();
        let err = table
            .add_relation(user, RelationDescriptor::one("team", "Team"))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownClass(name) if name == "Team"));
    }

    #[test]
    fn cid_attribute_is_inherited() {
        let (mut table, _, admin, settings) = table();
        let root_admin = table
            .declare(ClassSpec::new("RootAdmin").extends(admin))
            .unwrap();
        assert_eq!(table.cid_attribute(root_admin, "cid"), "_cid");
        assert_eq!(table.cid_attribute(settings, "cid"), "cid");
    }
}
