//! Territorial unit storage with hierarchy navigation.
//!
//! Units arrive through administrative import and rarely mutate. The store
//! keeps a child index alongside the units so descendant traversal does not
//! scan the whole map.

use std::collections::HashMap;

use crate::model::{TerritorialUnit, UnitKind};

/// Storage for the administrative hierarchy.
#[derive(Debug, Default)]
pub struct UnitStore {
    units: HashMap<String, TerritorialUnit>,
    children: HashMap<String, Vec<String>>,
}

impl UnitStore {
    /// Create a new empty unit store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, replacing any previous unit with the same id.
    pub fn add(&mut self, unit: TerritorialUnit) {
        if let Some(previous) = self.units.get(&unit.id) {
            if let Some(parent_id) = &previous.parent_id {
                if let Some(siblings) = self.children.get_mut(parent_id) {
                    siblings.retain(|id| id != &unit.id);
                }
            }
        }
        if let Some(parent_id) = &unit.parent_id {
            let siblings = self.children.entry(parent_id.clone()).or_default();
            if !siblings.contains(&unit.id) {
                siblings.push(unit.id.clone());
            }
        }
        self.units.insert(unit.id.clone(), unit);
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: &str) -> Option<TerritorialUnit> {
        let removed = self.units.remove(id)?;
        if let Some(parent_id) = &removed.parent_id {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|child| child != id);
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&TerritorialUnit> {
        self.units.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.units.keys()
    }

    /// All units of one hierarchy level.
    pub fn by_kind(&self, kind: UnitKind) -> impl Iterator<Item = &TerritorialUnit> {
        self.units.values().filter(move |u| u.kind == kind)
    }

    /// Direct children of a unit.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All units strictly below a unit in the tree.
    pub fn descendants(&self, id: &str) -> Vec<&TerritorialUnit> {
        let mut result = Vec::new();
        let mut queue: Vec<&str> = self.children_of(id).iter().map(String::as_str).collect();
        while let Some(child_id) = queue.pop() {
            if let Some(unit) = self.units.get(child_id) {
                result.push(unit);
                queue.extend(self.children_of(child_id).iter().map(String::as_str));
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
