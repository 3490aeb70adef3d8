use serde::{Deserialize, Serialize};

use crate::domain::direction::Direction;

/// One relationship-type definition supplied by the backend. The engine only
/// reads these; the list is refreshed wholesale by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipDef {
    pub id: i64,
    pub name: String,
    pub entry_type_id_from: i64,
    pub entry_type_id_to: i64,
}

/// Slim entry record used to populate target-entry selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntrySummary {
    pub id: i64,
    pub title: String,
    pub entry_type_id: i64,
}

/// Read-only cache of the relationship-definition and entry collaborators.
/// Lookup misses are ordinary `None` results: the backend may have deleted a
/// record since the cache was last refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    definitions: Vec<RelationshipDef>,
    entries: Vec<EntrySummary>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_definitions(&mut self, definitions: Vec<RelationshipDef>) {
        self.definitions = definitions;
    }

    pub fn replace_entries(&mut self, entries: Vec<EntrySummary>) {
        self.entries = entries;
    }

    pub fn definitions(&self) -> &[RelationshipDef] {
        &self.definitions
    }

    pub fn entries(&self) -> &[EntrySummary] {
        &self.entries
    }

    pub fn definition(&self, id: i64) -> Option<&RelationshipDef> {
        self.definitions.iter().find(|def| def.id == id)
    }

    pub fn entry(&self, id: i64) -> Option<&EntrySummary> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entry type a predicate's target must have, given the relationship
    /// definition and the predicate's direction. `To` means the current
    /// entry is the source, so the target sits on the `to` side.
    pub fn target_entry_type(&self, definition_id: i64, direction: Direction) -> Option<i64> {
        let definition = self.definition(definition_id)?;
        Some(match direction {
            Direction::To => definition.entry_type_id_to,
            Direction::From => definition.entry_type_id_from,
        })
    }

    /// Entries eligible as the target of a predicate, in cache order.
    pub fn candidate_entries(
        &self,
        definition_id: i64,
        direction: Direction,
    ) -> Vec<&EntrySummary> {
        match self.target_entry_type(definition_id, direction) {
            Some(entry_type_id) => self
                .entries
                .iter()
                .filter(|entry| entry.entry_type_id == entry_type_id)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Catalog, EntrySummary, RelationshipDef};
    use crate::domain::direction::Direction;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.replace_definitions(vec![RelationshipDef {
            id: 5,
            name: "brewed with".to_string(),
            entry_type_id_from: 1,
            entry_type_id_to: 2,
        }]);
        catalog.replace_entries(vec![
            EntrySummary {
                id: 10,
                title: "Pale Ale #3".to_string(),
                entry_type_id: 1,
            },
            EntrySummary {
                id: 42,
                title: "Cascade hops".to_string(),
                entry_type_id: 2,
            },
            EntrySummary {
                id: 43,
                title: "Citra hops".to_string(),
                entry_type_id: 2,
            },
        ]);
        catalog
    }

    #[test]
    fn resolves_target_type_per_direction() {
        let catalog = sample_catalog();
        assert_eq!(catalog.target_entry_type(5, Direction::To), Some(2));
        assert_eq!(catalog.target_entry_type(5, Direction::From), Some(1));
        assert_eq!(catalog.target_entry_type(99, Direction::To), None);
    }

    #[test]
    fn candidate_entries_follow_the_resolved_target_type() {
        let catalog = sample_catalog();
        let targets = catalog.candidate_entries(5, Direction::To);
        let ids: Vec<i64> = targets.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![42, 43]);

        let sources = catalog.candidate_entries(5, Direction::From);
        let ids: Vec<i64> = sources.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![10]);
    }

    #[test]
    fn unknown_definition_yields_no_candidates() {
        let catalog = sample_catalog();
        assert!(catalog.candidate_entries(99, Direction::To).is_empty());
    }

    #[test]
    fn lookups_miss_quietly() {
        let catalog = sample_catalog();
        assert!(catalog.definition(99).is_none());
        assert!(catalog.entry(99).is_none());
        assert_eq!(catalog.entry(42).map(|entry| entry.entry_type_id), Some(2));
    }
}
