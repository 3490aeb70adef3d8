use serde_json::{json, Value};

use super::{FilterGroup, FilterLeaf, FilterNode, FilterPatch, FilterTree};
use crate::domain::direction::Direction;
use crate::domain::operator::Operator;

fn leaf(id: u64, def: i64, target: i64, operator: Option<Operator>) -> FilterNode {
    FilterNode::Filter(FilterLeaf {
        id,
        relationship_def_id: Some(def),
        target_entry_id: Some(target),
        direction: Direction::To,
        operator,
    })
}

fn group(id: u64, operator: Option<Operator>, filters: Vec<FilterNode>) -> FilterNode {
    FilterNode::Group(FilterGroup {
        id,
        operator,
        filters,
    })
}

#[test]
fn export_then_load_on_a_fresh_tree_is_structurally_equal() {
    let mut tree = FilterTree::new();
    let root_leaf = tree.add_filter(None).unwrap();
    tree.update_filter(
        root_leaf,
        &FilterPatch {
            relationship_def_id: Some(5),
            target_entry_id: Some(42),
            direction: Some(Direction::From),
            operator: None,
        },
    );
    let nested = tree.add_group(None).unwrap();
    let inner = tree.add_filter(Some(nested)).unwrap();
    tree.update_filter(
        inner,
        &FilterPatch {
            relationship_def_id: Some(6),
            target_entry_id: Some(7),
            direction: None,
            operator: Some(Operator::Or),
        },
    );

    let exported = tree.export_tree();
    let mut fresh = FilterTree::new();
    fresh.load_tree(exported.clone());

    assert_eq!(fresh.export_tree(), exported);
    assert_eq!(fresh.to_filter_array(), tree.to_filter_array());
}

#[test]
fn export_preserves_loaded_ids_verbatim() {
    let loaded = vec![
        leaf(40, 1, 2, None),
        group(90, Some(Operator::And), vec![leaf(41, 3, 4, None)]),
    ];
    let mut tree = FilterTree::new();
    tree.load_tree(loaded.clone());

    let exported = tree.export_tree();
    assert_eq!(exported, loaded);
    assert_eq!(exported[0].id(), 40);
    assert_eq!(exported[1].id(), 90);
}

#[test]
fn export_is_a_snapshot_unaffected_by_later_edits() {
    let mut tree = FilterTree::new();
    let id = tree.add_filter(None).unwrap();
    let snapshot = tree.export_tree();

    tree.update_filter(
        id,
        &FilterPatch {
            relationship_def_id: Some(9),
            ..FilterPatch::default()
        },
    );
    tree.add_group(None).unwrap();

    assert_eq!(snapshot.len(), 1);
    let untouched = snapshot[0].as_leaf().unwrap();
    assert_eq!(untouched.relationship_def_id, None);
}

#[test]
fn flatten_walks_nested_groups_in_pre_order() {
    let nodes = vec![
        leaf(1, 10, 100, None),
        group(
            2,
            Some(Operator::And),
            vec![
                leaf(3, 20, 200, None),
                group(4, Some(Operator::Or), vec![leaf(5, 30, 300, None)]),
                leaf(6, 40, 400, Some(Operator::And)),
            ],
        ),
        leaf(7, 50, 500, Some(Operator::Or)),
    ];
    let mut tree = FilterTree::new();
    tree.load_tree(nodes);

    let criteria = tree.to_filter_array();
    let defs: Vec<i64> = criteria
        .iter()
        .map(|criterion| criterion.relationship_def_id)
        .collect();
    assert_eq!(defs, vec![10, 20, 30, 40, 50]);

    // Boundary operators: the group at index 1 hands its AND to leaf 20;
    // the inner group at index 1 of its sequence hands its OR to leaf 30.
    let operators: Vec<Option<Operator>> =
        criteria.iter().map(|criterion| criterion.operator).collect();
    assert_eq!(
        operators,
        vec![
            None,
            Some(Operator::And),
            Some(Operator::Or),
            Some(Operator::And),
            Some(Operator::Or),
        ]
    );
}

#[test]
fn skipped_nodes_do_not_shift_index_based_inheritance() {
    // An incomplete leaf at index 0 still occupies index 0: the complete
    // leaf behind it keeps its own operator rather than inheriting the
    // boundary.
    let nodes = vec![group(
        1,
        None,
        vec![
            FilterNode::Filter(FilterLeaf {
                id: 2,
                relationship_def_id: None,
                target_entry_id: None,
                direction: Direction::To,
                operator: None,
            }),
            leaf(3, 20, 200, Some(Operator::And)),
        ],
    )];
    let mut tree = FilterTree::new();
    tree.load_tree(nodes);

    let criteria = tree.to_filter_array();
    assert_eq!(criteria.len(), 1);
    assert_eq!(criteria[0].operator, Some(Operator::And));
}

#[test]
fn persisted_wire_shape_matches_the_tagged_format() {
    let nodes = vec![
        leaf(1, 5, 42, None),
        group(2, Some(Operator::Or), vec![leaf(3, 6, 7, Some(Operator::And))]),
    ];
    let value = serde_json::to_value(&nodes).expect("tree should serialize");

    assert_eq!(
        value,
        json!([
            {
                "type": "filter",
                "id": 1,
                "relationship_def_id": 5,
                "target_entry_id": 42,
                "direction": "to",
            },
            {
                "type": "group",
                "id": 2,
                "operator": "or",
                "filters": [
                    {
                        "type": "filter",
                        "id": 3,
                        "relationship_def_id": 6,
                        "target_entry_id": 7,
                        "direction": "to",
                        "operator": "and",
                    }
                ],
            }
        ])
    );
}

#[test]
fn deserializes_sparse_wire_nodes_with_defaults() {
    let raw: Value = json!([
        { "type": "filter", "id": 1, "direction": "to" },
        { "type": "group", "id": 2 }
    ]);
    let nodes: Vec<FilterNode> =
        serde_json::from_value(raw).expect("sparse nodes should deserialize");

    let leaf = nodes[0].as_leaf().expect("first node should be a leaf");
    assert_eq!(leaf.relationship_def_id, None);
    assert_eq!(leaf.target_entry_id, None);
    assert_eq!(leaf.operator, None);

    let group = nodes[1].as_group().expect("second node should be a group");
    assert!(group.filters.is_empty());
    assert_eq!(group.operator, None);
}
