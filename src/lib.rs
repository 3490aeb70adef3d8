pub mod domain;
pub mod filter_tree;
pub mod library;
pub mod store;

pub use domain::catalog::{Catalog, EntrySummary, RelationshipDef};
pub use domain::direction::Direction;
pub use domain::operator::Operator;
pub use filter_tree::{
    FilterGroup, FilterLeaf, FilterNode, FilterPatch, FilterTree, ResolvedCriterion, TreeChange,
};
pub use library::{LibraryError, SavedSearchView, SearchLibrary};
