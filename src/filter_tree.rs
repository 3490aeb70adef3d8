use serde::{Deserialize, Serialize};

use crate::domain::direction::Direction;
use crate::domain::operator::Operator;

/// One relationship predicate being edited. Both ids start unset; the leaf
/// stays in the tree while incomplete and is only excluded from the
/// flattened output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterLeaf {
    pub id: u64,
    #[serde(default)]
    pub relationship_def_id: Option<i64>,
    #[serde(default)]
    pub target_entry_id: Option<i64>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
}

impl FilterLeaf {
    /// A leaf contributes to the flattened output only once both the
    /// relationship definition and the target entry are chosen.
    pub fn is_complete(&self) -> bool {
        self.relationship_def_id.is_some() && self.target_entry_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterGroup {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub filters: Vec<FilterNode>,
}

/// Node of the filter tree. The serde form is the persisted tree format:
/// `{"type":"filter", ...}` / `{"type":"group", ..., "filters":[...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    Filter(FilterLeaf),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn id(&self) -> u64 {
        match self {
            FilterNode::Filter(leaf) => leaf.id,
            FilterNode::Group(group) => group.id,
        }
    }

    pub fn as_leaf(&self) -> Option<&FilterLeaf> {
        match self {
            FilterNode::Filter(leaf) => Some(leaf),
            FilterNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&FilterGroup> {
        match self {
            FilterNode::Filter(_) => None,
            FilterNode::Group(group) => Some(group),
        }
    }
}

/// Partial update for a leaf: fields set to `Some` are merged in, the rest
/// are left untouched. Applying a patch to a group or a missing id is a
/// silent no-op so stale UI callbacks stay harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub relationship_def_id: Option<i64>,
    pub target_entry_id: Option<i64>,
    pub direction: Option<Direction>,
    pub operator: Option<Operator>,
}

/// One fully specified predicate in the flattened filter chain handed to
/// the query evaluator. `operator` is `None` only at the head of the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedCriterion {
    pub relationship_def_id: i64,
    pub target_entry_id: i64,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
}

/// Mutation notification delivered to the observer after the tree changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    FilterAdded { id: u64, parent: Option<u64> },
    GroupAdded { id: u64, parent: Option<u64> },
    ItemRemoved { id: u64 },
    FilterUpdated { id: u64 },
    Cleared,
    Loaded,
}

impl TreeChange {
    pub fn as_str(self) -> &'static str {
        match self {
            TreeChange::FilterAdded { .. } => "filter.added",
            TreeChange::GroupAdded { .. } => "group.added",
            TreeChange::ItemRemoved { .. } => "item.removed",
            TreeChange::FilterUpdated { .. } => "filter.updated",
            TreeChange::Cleared => "tree.cleared",
            TreeChange::Loaded => "tree.loaded",
        }
    }
}

type ChangeObserver = Box<dyn FnMut(&TreeChange)>;

/// Mutable tree of relationship filters for one editing session. Owns the
/// root sequence and the id counter; ids are never reused within one
/// instance, not even after removal or clear.
pub struct FilterTree {
    root: Vec<FilterNode>,
    next_id: u64,
    observer: Option<ChangeObserver>,
}

impl Default for FilterTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterTree {
    pub fn new() -> Self {
        Self {
            root: Vec::new(),
            next_id: 1,
            observer: None,
        }
    }

    /// Builds a tree that reports every mutation to `observer`, replacing
    /// the source's overridable on-change hook.
    pub fn with_observer(observer: impl FnMut(&TreeChange) + 'static) -> Self {
        Self {
            root: Vec::new(),
            next_id: 1,
            observer: Some(Box::new(observer)),
        }
    }

    pub fn root(&self) -> &[FilterNode] {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Appends a fresh, incomplete leaf to the root sequence (`parent` =
    /// `None`) or to the named group's children. Returns the new leaf's id,
    /// or `None` when `parent` does not resolve to a group in this tree.
    pub fn add_filter(&mut self, parent: Option<u64>) -> Option<u64> {
        let id = self.next_id;
        let leaf = FilterNode::Filter(FilterLeaf {
            id,
            relationship_def_id: None,
            target_entry_id: None,
            direction: Direction::To,
            operator: None,
        });
        self.append_node(parent, leaf)?;
        self.next_id += 1;
        self.notify(TreeChange::FilterAdded { id, parent });
        Some(id)
    }

    /// Same contract as `add_filter`, but appends an empty group. Populating
    /// the group is done by passing its id as `parent` to later calls.
    pub fn add_group(&mut self, parent: Option<u64>) -> Option<u64> {
        let id = self.next_id;
        let group = FilterNode::Group(FilterGroup {
            id,
            operator: None,
            filters: Vec::new(),
        });
        self.append_node(parent, group)?;
        self.next_id += 1;
        self.notify(TreeChange::GroupAdded { id, parent });
        Some(id)
    }

    /// Removes the node with `id` wherever it sits in the tree. Removing a
    /// group discards its entire subtree. Returns false when no node with
    /// that id exists, which callers treat as "already gone".
    pub fn remove_item(&mut self, id: u64) -> bool {
        let removed = remove_from(&mut self.root, id);
        if removed {
            self.notify(TreeChange::ItemRemoved { id });
        }
        removed
    }

    /// Depth-first lookup across the whole tree. Ids are unique, so the
    /// first match is the only match.
    pub fn find_item(&self, id: u64) -> Option<&FilterNode> {
        find_in(&self.root, id)
    }

    /// Merges `patch` into the leaf with `id`. A group id or a missing id is
    /// ignored without error.
    pub fn update_filter(&mut self, id: u64, patch: &FilterPatch) {
        let Some(FilterNode::Filter(leaf)) = find_in_mut(&mut self.root, id) else {
            return;
        };
        if let Some(relationship_def_id) = patch.relationship_def_id {
            leaf.relationship_def_id = Some(relationship_def_id);
        }
        if let Some(target_entry_id) = patch.target_entry_id {
            leaf.target_entry_id = Some(target_entry_id);
        }
        if let Some(direction) = patch.direction {
            leaf.direction = direction;
        }
        if let Some(operator) = patch.operator {
            leaf.operator = Some(operator);
        }
        self.notify(TreeChange::FilterUpdated { id });
    }

    /// Flattens the tree into the ordered criterion chain handed to the
    /// query evaluator. Incomplete leaves and empty groups are skipped;
    /// groups are dissolved, delegating their boundary operator to their
    /// first descendant leaf. The output is a single left-associative
    /// chain: parenthesization is not representable in it, so the
    /// evaluator sees `(a OR b) AND c` and `a OR (b AND c)` identically.
    pub fn to_filter_array(&self) -> Vec<ResolvedCriterion> {
        let mut out = Vec::new();
        flatten_into(&self.root, None, &mut out);
        out
    }

    /// Replaces the whole tree with a previously exported structure. The id
    /// counter is bumped past every id in the loaded tree (and never moved
    /// backwards), so later `add_filter`/`add_group` calls cannot collide
    /// with loaded ids.
    pub fn load_tree(&mut self, nodes: Vec<FilterNode>) {
        self.next_id = self.next_id.max(max_id(&nodes) + 1);
        self.root = nodes;
        self.notify(TreeChange::Loaded);
    }

    /// Snapshot of the tree for persistence. Cloned so the caller can hold
    /// it across further edits; ids are preserved verbatim.
    pub fn export_tree(&self) -> Vec<FilterNode> {
        self.root.clone()
    }

    /// Empties the tree. The id counter is deliberately not reset.
    pub fn clear_all_filters(&mut self) {
        self.root.clear();
        self.notify(TreeChange::Cleared);
    }

    fn append_node(&mut self, parent: Option<u64>, node: FilterNode) -> Option<()> {
        match parent {
            None => {
                self.root.push(node);
                Some(())
            }
            Some(parent_id) => {
                let group = find_group_mut(&mut self.root, parent_id)?;
                group.filters.push(node);
                Some(())
            }
        }
    }

    fn notify(&mut self, change: TreeChange) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&change);
        }
    }
}

fn remove_from(nodes: &mut Vec<FilterNode>, id: u64) -> bool {
    if let Some(position) = nodes.iter().position(|node| node.id() == id) {
        nodes.remove(position);
        return true;
    }
    for node in nodes.iter_mut() {
        if let FilterNode::Group(group) = node {
            if remove_from(&mut group.filters, id) {
                return true;
            }
        }
    }
    false
}

fn find_in(nodes: &[FilterNode], id: u64) -> Option<&FilterNode> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let FilterNode::Group(group) = node {
            if let Some(found) = find_in(&group.filters, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_mut(nodes: &mut [FilterNode], id: u64) -> Option<&mut FilterNode> {
    for node in nodes.iter_mut() {
        if node.id() == id {
            return Some(node);
        }
        if let FilterNode::Group(group) = node {
            if let Some(found) = find_in_mut(&mut group.filters, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_group_mut(nodes: &mut [FilterNode], id: u64) -> Option<&mut FilterGroup> {
    match find_in_mut(nodes, id) {
        Some(FilterNode::Group(group)) => Some(group),
        _ => None,
    }
}

/// Pre-order, left-to-right flatten. `inherited` is the operator the
/// enclosing sequence's boundary carries down; it applies to whatever node
/// sits at index 0, while every later node uses its own operator field.
fn flatten_into(
    nodes: &[FilterNode],
    inherited: Option<Operator>,
    out: &mut Vec<ResolvedCriterion>,
) {
    for (index, node) in nodes.iter().enumerate() {
        match node {
            FilterNode::Filter(leaf) => {
                let (Some(relationship_def_id), Some(target_entry_id)) =
                    (leaf.relationship_def_id, leaf.target_entry_id)
                else {
                    continue;
                };
                let operator = if index == 0 { inherited } else { leaf.operator };
                out.push(ResolvedCriterion {
                    relationship_def_id,
                    target_entry_id,
                    direction: leaf.direction,
                    operator,
                });
            }
            FilterNode::Group(group) => {
                if group.filters.is_empty() {
                    continue;
                }
                let boundary = if index == 0 { inherited } else { group.operator };
                flatten_into(&group.filters, boundary, out);
            }
        }
    }
}

fn max_id(nodes: &[FilterNode]) -> u64 {
    let mut max = 0;
    for node in nodes {
        max = max.max(node.id());
        if let FilterNode::Group(group) = node {
            max = max.max(max_id(&group.filters));
        }
    }
    max
}

#[cfg(test)]
mod tests;

#[cfg(test)]
#[path = "filter_tree_tests_ext.rs"]
mod tests_ext;
