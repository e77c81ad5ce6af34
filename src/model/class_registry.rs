//! Session-wide class registry.
//!
//! Maps class names to stable integer IDs. IDs are handed out in first-use
//! order starting at 0 and never change, even when a class is renamed.

use crate::color_utils::palette_rgb8;
use crate::error::{Error, Result};

/// A registered class with its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Stable identifier, also the label-file class index
    pub id: u32,
    /// Current display name
    pub name: String,
    /// RGB color derived from the ID
    pub color: [u8; 3],
}

impl ClassEntry {
    /// Create a new entry; the color is derived from `id`.
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: class_color(id),
        }
    }
}

/// Deterministic, well-spread color for a class ID.
pub fn class_color(id: u32) -> [u8; 3] {
    palette_rgb8(id)
}

/// Name → ID mapping shared by every image in the session.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    /// Entries kept sorted by ID
    entries: Vec<ClassEntry>,
    next_id: u32,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by resolving each name in order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() {
                registry.resolve(name);
            }
        }
        registry
    }

    /// Return the ID for `name`, registering it with the next ID if unseen.
    pub fn resolve(&mut self, name: &str) -> u32 {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(ClassEntry::new(id, name));
        log::debug!("Registered class '{}' as id {}", name, id);
        id
    }

    /// Register a class under an explicit ID (used when importing label files).
    ///
    /// Existing IDs are left untouched. Later `resolve` calls never reuse `id`.
    pub fn register_with_id(&mut self, id: u32, name: &str) -> &ClassEntry {
        let pos = match self.entries.binary_search_by_key(&id, |e| e.id) {
            Ok(pos) => pos,
            Err(pos) => {
                let name = if self.id_of(name).is_some() {
                    format!("{}_{}", name, id)
                } else {
                    name.to_string()
                };
                log::debug!("Registered imported class '{}' as id {}", name, id);
                self.entries.insert(pos, ClassEntry::new(id, &name));
                self.next_id = self.next_id.max(id + 1);
                pos
            }
        };
        &self.entries[pos]
    }

    /// Rename a class in place, keeping its ID.
    ///
    /// Fails with `AlreadyExists` if `new` names a different class and with
    /// `ClassNotFound` if `old` is unknown. Renaming to the same name is a no-op.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<u32> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::EmptyClassName);
        }
        let id = self.id_of(old).ok_or_else(|| Error::ClassNotFound {
            name: old.to_string(),
        })?;
        match self.id_of(new) {
            Some(other) if other != id => {
                return Err(Error::AlreadyExists {
                    name: new.to_string(),
                });
            }
            _ => {}
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.name = new.to_string();
        }
        log::info!("Renamed class {} '{}' -> '{}'", id, old, new);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.get(id).map(|e| e.name.as_str())
    }

    pub fn get(&self, id: u32) -> Option<&ClassEntry> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    /// All classes in ID order.
    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_idempotent_and_monotonic() {
        let mut registry = ClassRegistry::new();
        assert_eq!(registry.resolve("cat"), 0);
        assert_eq!(registry.resolve("dog"), 1);
        assert_eq!(registry.resolve("cat"), 0);
        assert_eq!(registry.resolve("bird"), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_rename_preserves_id() {
        let mut registry = ClassRegistry::new();
        registry.resolve("cat");
        let dog = registry.resolve("dog");

        assert_eq!(registry.rename("dog", "puppy").unwrap(), dog);
        assert_eq!(registry.id_of("puppy"), Some(dog));
        assert_eq!(registry.id_of("dog"), None);
        // A new name after a rename still gets a fresh id
        assert_eq!(registry.resolve("dog"), 2);
    }

    #[test]
    fn test_rename_collision() {
        let mut registry = ClassRegistry::from_names(["cat", "dog"]);
        let err = registry.rename("cat", "dog").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { ref name } if name == "dog"));
        assert_eq!(registry.name_of(0), Some("cat"));
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let mut registry = ClassRegistry::from_names(["cat"]);
        assert_eq!(registry.rename("cat", "cat").unwrap(), 0);
    }

    #[test]
    fn test_rename_unknown_class() {
        let mut registry = ClassRegistry::new();
        assert!(matches!(
            registry.rename("ghost", "spirit"),
            Err(Error::ClassNotFound { .. })
        ));
    }

    #[test]
    fn test_register_with_id_bumps_next_id() {
        let mut registry = ClassRegistry::from_names(["cat"]);
        registry.register_with_id(5, "class5");
        assert_eq!(registry.name_of(5), Some("class5"));
        assert_eq!(registry.resolve("dog"), 6);

        let ids: Vec<u32> = registry.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 5, 6]);
    }

    #[test]
    fn test_register_with_existing_id_keeps_name() {
        let mut registry = ClassRegistry::from_names(["cat"]);
        let entry = registry.register_with_id(0, "class0");
        assert_eq!(entry.name, "cat");
    }

    #[test]
    fn test_register_with_taken_name_is_disambiguated() {
        let mut registry = ClassRegistry::from_names(["cat"]);
        registry.register_with_id(3, "cat");
        assert_eq!(registry.name_of(3), Some("cat_3"));
    }

    #[test]
    fn test_class_colors_differ() {
        assert_ne!(class_color(0), class_color(1));
        assert_eq!(class_color(7), ClassEntry::new(7, "x").color);
    }
}
