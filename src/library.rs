use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::filter_tree::{FilterNode, FilterTree};
use crate::store::{self, now_utc_rfc3339, SavedSearchRecord, UpsertSavedSearch};

/// Local library of named saved searches. Each row stores one exported
/// filter tree as JSON in the persisted tree format.
pub struct SearchLibrary {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SavedSearchView {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    /// Count of fully specified predicates in the stored tree.
    pub criteria_count: usize,
}

impl SearchLibrary {
    pub fn open(db_path: &str) -> Result<Self, LibraryError> {
        ensure_parent_dir(db_path)?;
        let conn = store::open_connection(db_path)?;
        Ok(Self { conn })
    }

    /// Persists the tree's current export under a new id.
    pub fn save(&self, name: &str, tree: &FilterTree) -> Result<SavedSearchView, LibraryError> {
        let name = normalized_name(name)?;
        let id = format!("S-{}", Uuid::now_v7());
        let now = now_utc_rfc3339();
        self.write_row(&id, &name, tree, &now, &now)?;
        self.view(&id)
    }

    /// Overwrites an existing saved search with the tree's current export,
    /// optionally renaming it.
    pub fn resave(
        &self,
        id: &str,
        name: Option<&str>,
        tree: &FilterTree,
    ) -> Result<SavedSearchView, LibraryError> {
        let existing = self.record(id)?;
        let name = match name {
            Some(name) => normalized_name(name)?,
            None => existing.name,
        };
        self.write_row(id, &name, tree, &existing.created_at, &now_utc_rfc3339())?;
        self.view(id)
    }

    /// Restores a saved search into a fresh editing tree. The tree's id
    /// counter is resynced past every stored id by `load_tree`.
    pub fn load(&self, id: &str) -> Result<FilterTree, LibraryError> {
        let record = self.record(id)?;
        let nodes: Vec<FilterNode> = serde_json::from_str(&record.tree_json)?;
        let mut tree = FilterTree::new();
        tree.load_tree(nodes);
        Ok(tree)
    }

    pub fn list(&self) -> Result<Vec<SavedSearchView>, LibraryError> {
        let records = store::list_saved_searches(&self.conn)?;
        records.into_iter().map(view_of).collect()
    }

    pub fn rename(&self, id: &str, name: &str) -> Result<SavedSearchView, LibraryError> {
        let name = normalized_name(name)?;
        let existing = self.record(id)?;
        store::upsert_saved_search(
            &self.conn,
            &UpsertSavedSearch {
                id,
                name: &name,
                tree_json: &existing.tree_json,
                created_at: &existing.created_at,
                updated_at: &now_utc_rfc3339(),
            },
        )?;
        self.view(id)
    }

    pub fn delete(&self, id: &str) -> Result<(), LibraryError> {
        if !store::delete_saved_search(&self.conn, id)? {
            return Err(LibraryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn write_row(
        &self,
        id: &str,
        name: &str,
        tree: &FilterTree,
        created_at: &str,
        updated_at: &str,
    ) -> Result<(), LibraryError> {
        let tree_json = serde_json::to_string(&tree.export_tree())?;
        store::upsert_saved_search(
            &self.conn,
            &UpsertSavedSearch {
                id,
                name,
                tree_json: &tree_json,
                created_at,
                updated_at,
            },
        )?;
        Ok(())
    }

    fn record(&self, id: &str) -> Result<SavedSearchRecord, LibraryError> {
        store::get_saved_search(&self.conn, id)?
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))
    }

    fn view(&self, id: &str) -> Result<SavedSearchView, LibraryError> {
        view_of(self.record(id)?)
    }
}

fn view_of(record: SavedSearchRecord) -> Result<SavedSearchView, LibraryError> {
    let nodes: Vec<FilterNode> = serde_json::from_str(&record.tree_json)?;
    let mut tree = FilterTree::new();
    tree.load_tree(nodes);
    Ok(SavedSearchView {
        id: record.id,
        name: record.name,
        created_at: record.created_at,
        updated_at: record.updated_at,
        criteria_count: tree.to_filter_array().len(),
    })
}

fn normalized_name(name: &str) -> Result<String, LibraryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::InvalidArgument(
            "saved search name must not be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn ensure_parent_dir(path: &str) -> Result<(), LibraryError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "I/O error: {}", err),
            LibraryError::Db(err) => write!(f, "database error: {}", err),
            LibraryError::Json(err) => write!(f, "saved tree JSON error: {}", err),
            LibraryError::InvalidArgument(message) => write!(f, "{}", message),
            LibraryError::NotFound(id) => write!(f, "saved search '{}' not found", id),
        }
    }
}

impl Error for LibraryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LibraryError::Io(err) => Some(err),
            LibraryError::Db(err) => Some(err),
            LibraryError::Json(err) => Some(err),
            LibraryError::InvalidArgument(_) => None,
            LibraryError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(value: std::io::Error) -> Self {
        LibraryError::Io(value)
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(value: rusqlite::Error) -> Self {
        LibraryError::Db(value)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(value: serde_json::Error) -> Self {
        LibraryError::Json(value)
    }
}
