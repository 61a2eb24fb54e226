use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::error::LookupError;
use crate::items::Item;
use crate::recipes::RecipeLine;

/// Classification of a material in the bill of materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Leaf,         // Consumed as is
    Intermediate, // Manufactured from other materials
}

/// A node in the bill of materials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionNode {
    pub id: u32,
    pub name: String,
    pub quantity: u64,
    /// 0 for the root's direct materials
    pub depth: u32,
    pub kind: NodeKind,
    pub is_hull: bool,
    /// Inputs needed to produce this, empty for leaves and suppressed cycles
    pub children: Vec<ExpansionNode>,
}

/// Direct materials of a looked-up item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub root: Item,
    pub root_name: String,
    pub direct_materials: Vec<ExpansionNode>,
    /// True if any direct material can be resolved further
    pub has_deeper_layers: bool,
}

/// Fully resolved bill of materials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomTree {
    pub root: Item,
    pub materials: Vec<ExpansionNode>,
}

impl BomTree {
    /// Tree holding only the direct materials of a breakdown, used before
    /// layers are resolved
    pub fn flat(breakdown: &Breakdown) -> Self {
        Self {
            root: breakdown.root.clone(),
            materials: breakdown.direct_materials.clone(),
        }
    }

    /// No material below the root's direct materials
    pub fn is_flat(&self) -> bool {
        self.materials.iter().all(|node| node.children.is_empty())
    }

    /// Pre-order walk over every node
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: self.materials.iter().rev().collect(),
        }
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a ExpansionNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a ExpansionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Scaled quantity of a recipe line, `None` if the line must be skipped
pub(crate) fn scaled_quantity(multiplier: u64, line: &RecipeLine) -> Option<u64> {
    if line.quantity <= 0 {
        return None;
    }
    let quantity = multiplier.checked_mul(line.quantity as u64);
    if quantity.is_none() {
        tracing::warn!(
            material_id = line.material_id,
            multiplier,
            "quantity overflow, skipping line"
        );
    }
    quantity.filter(|q| *q > 0)
}

fn leaf_or_intermediate(
    catalog: &Catalog,
    id: u32,
    quantity: u64,
    depth: u32,
    recipe: &[RecipeLine],
) -> ExpansionNode {
    ExpansionNode {
        id,
        name: catalog.display_name(id),
        quantity,
        depth,
        kind: if recipe.is_empty() {
            NodeKind::Leaf
        } else {
            NodeKind::Intermediate
        },
        is_hull: catalog.is_hull(id),
        children: vec![],
    }
}

fn expand_lines(
    catalog: &Catalog,
    lines: &[RecipeLine],
    multiplier: u64,
    depth: u32,
    visited: &mut HashSet<u32>, // Materials on the current path
) -> Vec<ExpansionNode> {
    let mut nodes = Vec::with_capacity(lines.len());

    for line in lines {
        let Some(quantity) = scaled_quantity(multiplier, line) else {
            continue;
        };

        let recipe = catalog.resolve(line.material_id);
        let mut node = leaf_or_intermediate(catalog, line.material_id, quantity, depth, &recipe);

        if !recipe.is_empty() {
            if visited.insert(line.material_id) {
                node.children = expand_lines(catalog, &recipe, quantity, depth + 1, visited);
                visited.remove(&line.material_id); // Allow this material in other branches
            } else {
                tracing::debug!(
                    material_id = line.material_id,
                    depth,
                    "material already on path, not descending"
                );
            }
        }

        nodes.push(node);
    }

    nodes
}

/// Expand the recipe of `material_id`, scaled by `multiplier`.
///
/// `visited` holds the materials on the path leading here; `material_id` is
/// added for the duration of the call. A material already on the path is
/// still emitted but not descended into.
pub fn expand_tree(
    catalog: &Catalog,
    material_id: u32,
    multiplier: u64,
    depth: u32,
    visited: &mut HashSet<u32>,
) -> Vec<ExpansionNode> {
    let entered = visited.insert(material_id);
    let recipe = catalog.resolve(material_id);
    let children = expand_lines(catalog, &recipe, multiplier, depth, visited);
    if entered {
        visited.remove(&material_id);
    }
    children
}

/// Look up an item by name and break it down into its direct materials
pub fn expand(catalog: &Catalog, query: &str) -> Result<Breakdown, LookupError> {
    let (root, lines) = catalog.resolve_query(query)?;

    let direct_materials: Vec<ExpansionNode> = lines
        .iter()
        .filter_map(|line| {
            let quantity = scaled_quantity(1, line)?;
            let recipe = catalog.resolve(line.material_id);
            Some(leaf_or_intermediate(
                catalog,
                line.material_id,
                quantity,
                0,
                &recipe,
            ))
        })
        .collect();

    if direct_materials.is_empty() {
        return Err(LookupError::NoRecipe { name: root.name });
    }

    let has_deeper_layers = direct_materials
        .iter()
        .any(|node| node.kind == NodeKind::Intermediate);

    Ok(Breakdown {
        root_name: root.name.clone(),
        root,
        direct_materials,
        has_deeper_layers,
    })
}

/// Resolve every layer below the direct materials of a breakdown.
/// Each direct material starts a fresh path holding only the root.
pub fn resolve_all_layers(catalog: &Catalog, breakdown: &Breakdown) -> BomTree {
    let materials = breakdown
        .direct_materials
        .iter()
        .map(|direct| {
            let mut node = direct.clone();
            let mut visited = HashSet::from([breakdown.root.id]);

            if node.kind == NodeKind::Intermediate && !visited.contains(&node.id) {
                node.children = expand_tree(catalog, node.id, node.quantity, 1, &mut visited);
            }
            node
        })
        .collect();

    BomTree {
        root: breakdown.root.clone(),
        materials,
    }
}

/// Look up an item and resolve its whole bill of materials
pub fn build_full_tree(catalog: &Catalog, query: &str) -> Result<BomTree, LookupError> {
    let breakdown = expand(catalog, query)?;
    Ok(resolve_all_layers(catalog, &breakdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ItemIndex;
    use crate::market_groups::{MarketGroups, ParentRef};
    use crate::recipes::RecipeStore;

    fn item(id: u32, name: &str, group: Option<u32>) -> Item {
        Item {
            id,
            name: name.to_string(),
            market_group_id: group,
        }
    }

    /// Frigate (100) <- Hull (50, ship group) + Armor (5)
    /// Hull <- Component (9) x2, Armor <- Plate (12) x2, Plate <- Tritanium (34)
    fn ship_catalog() -> Catalog {
        Catalog::new(
            ItemIndex::from_items([
                item(100, "Frigate", None),
                item(50, "Hull", Some(64)),
                item(5, "Armor", None),
                item(9, "Component", None),
                item(12, "Plate", None),
                item(34, "Tritanium", None),
            ]),
            RecipeStore::from_recipes([
                (
                    100,
                    vec![
                        RecipeLine::manufacturing(50, 1),
                        RecipeLine::manufacturing(5, 10),
                    ],
                ),
                (50, vec![RecipeLine::manufacturing(9, 2)]),
                (5, vec![RecipeLine::manufacturing(12, 2)]),
                (12, vec![RecipeLine::manufacturing(34, 7)]),
            ]),
            MarketGroups::from_parents([(4, ParentRef::Terminal), (64, ParentRef::Group(4))]),
        )
    }

    fn cyclic_catalog() -> Catalog {
        Catalog::new(
            ItemIndex::from_items([
                item(1, "Root", None),
                item(2, "A", None),
                item(3, "B", None),
            ]),
            RecipeStore::from_recipes([
                (1, vec![RecipeLine::manufacturing(2, 1)]),
                (2, vec![RecipeLine::manufacturing(3, 1)]),
                (3, vec![RecipeLine::manufacturing(2, 1)]),
            ]),
            MarketGroups::default(),
        )
    }

    fn max_occurrences_on_a_path(nodes: &[ExpansionNode], path: &mut Vec<u32>) -> usize {
        let mut worst = 0;
        for node in nodes {
            path.push(node.id);
            let here = path.iter().filter(|id| **id == node.id).count();
            worst = worst
                .max(here)
                .max(max_occurrences_on_a_path(&node.children, path));
            path.pop();
        }
        worst
    }

    #[test]
    fn test_breakdown_classifies_direct_materials() {
        let catalog = ship_catalog();

        let breakdown = expand(&catalog, "frigate").unwrap();

        assert_eq!(breakdown.root_name, "Frigate");
        assert!(breakdown.has_deeper_layers);
        let ids: Vec<u32> = breakdown.direct_materials.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![50, 5]);
        assert!(breakdown.direct_materials[0].is_hull);
        assert!(!breakdown.direct_materials[1].is_hull);
        assert!(breakdown
            .direct_materials
            .iter()
            .all(|n| n.depth == 0 && n.children.is_empty()));
    }

    #[test]
    fn test_quantities_scale_with_multiplier() {
        let catalog = ship_catalog();

        let children = expand_tree(&catalog, 5, 10, 1, &mut HashSet::new());

        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 12);
        assert_eq!(children[0].quantity, 20);
        assert_eq!(children[0].depth, 1);
        assert_eq!(children[0].kind, NodeKind::Intermediate);
        assert_eq!(children[0].children[0].quantity, 140);
        assert_eq!(children[0].children[0].kind, NodeKind::Leaf);
        assert_eq!(children[0].children[0].depth, 2);
    }

    #[test]
    fn test_full_tree_depths_and_order() {
        let catalog = ship_catalog();

        let tree = build_full_tree(&catalog, "Frigate").unwrap();

        let walk: Vec<(u32, u64, u32)> =
            tree.nodes().map(|n| (n.id, n.quantity, n.depth)).collect();
        assert_eq!(
            walk,
            vec![
                (50, 1, 0),
                (9, 2, 1),
                (5, 10, 0),
                (12, 20, 1),
                (34, 140, 2),
            ]
        );
        assert!(!tree.is_flat());
    }

    #[test]
    fn test_cycle_terminates_with_single_reentry() {
        let catalog = cyclic_catalog();

        let nodes = expand_tree(&catalog, 2, 1, 1, &mut HashSet::new());

        // A -> B -> A (not descended)
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, 3);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].id, 2);
        assert_eq!(nodes[0].children[0].kind, NodeKind::Intermediate);
        assert!(nodes[0].children[0].children.is_empty());

        let mut path = vec![2];
        assert!(max_occurrences_on_a_path(&nodes, &mut path) <= 2);
    }

    #[test]
    fn test_cycle_through_full_tree() {
        let catalog = cyclic_catalog();

        let tree = build_full_tree(&catalog, "Root").unwrap();

        assert!(max_occurrences_on_a_path(&tree.materials, &mut vec![]) <= 2);
        assert_eq!(tree.nodes().count(), 3);
    }

    #[test]
    fn test_visited_set_is_restored() {
        let catalog = cyclic_catalog();
        let mut visited = HashSet::from([1]);

        expand_tree(&catalog, 2, 1, 1, &mut visited);

        assert_eq!(visited, HashSet::from([1]));
    }

    #[test]
    fn test_same_material_in_sibling_branches_expands_both() {
        let catalog = Catalog::new(
            ItemIndex::from_items([
                item(1, "Root", None),
                item(2, "Left", None),
                item(3, "Right", None),
                item(4, "Shared", None),
                item(5, "Ore", None),
            ]),
            RecipeStore::from_recipes([
                (
                    1,
                    vec![
                        RecipeLine::manufacturing(2, 1),
                        RecipeLine::manufacturing(3, 1),
                    ],
                ),
                (2, vec![RecipeLine::manufacturing(4, 2)]),
                (3, vec![RecipeLine::manufacturing(4, 3)]),
                (4, vec![RecipeLine::manufacturing(5, 10)]),
            ]),
            MarketGroups::default(),
        );

        let tree = build_full_tree(&catalog, "Root").unwrap();

        let ore: Vec<u64> = tree
            .nodes()
            .filter(|n| n.id == 5)
            .map(|n| n.quantity)
            .collect();
        assert_eq!(ore, vec![20, 30]);
    }

    #[test]
    fn test_non_positive_lines_are_dropped() {
        let catalog = Catalog::new(
            ItemIndex::from_items([item(1, "Root", None), item(2, "Part", None)]),
            RecipeStore::from_recipes([(
                1,
                vec![
                    RecipeLine::manufacturing(2, 0),
                    RecipeLine::manufacturing(2, -3),
                    RecipeLine::manufacturing(2, 4),
                ],
            )]),
            MarketGroups::default(),
        );

        let breakdown = expand(&catalog, "Root").unwrap();

        assert_eq!(breakdown.direct_materials.len(), 1);
        assert_eq!(breakdown.direct_materials[0].quantity, 4);
        assert!(!breakdown.has_deeper_layers);
    }

    #[test]
    fn test_unknown_material_is_a_named_leaf() {
        let catalog = Catalog::new(
            ItemIndex::from_items([item(1, "Root", None)]),
            RecipeStore::from_recipes([(1, vec![RecipeLine::manufacturing(777, 3)])]),
            MarketGroups::default(),
        );

        let tree = build_full_tree(&catalog, "Root").unwrap();

        assert_eq!(tree.materials[0].name, "Type ID: 777");
        assert_eq!(tree.materials[0].kind, NodeKind::Leaf);
        assert!(tree.is_flat());
    }

    #[test]
    fn test_no_recipe_and_not_found() {
        let catalog = ship_catalog();

        assert_eq!(
            expand(&catalog, "Tritanium"),
            Err(LookupError::NoRecipe {
                name: "Tritanium".to_string()
            })
        );
        assert!(matches!(
            expand(&catalog, "Battleship"),
            Err(LookupError::NotFound { .. })
        ));
    }

    #[test]
    fn test_expansion_is_repeatable() {
        let catalog = ship_catalog();

        let first = build_full_tree(&catalog, "Frigate").unwrap();
        let second = build_full_tree(&catalog, "Frigate").unwrap();

        assert_eq!(first, second);
    }
}
