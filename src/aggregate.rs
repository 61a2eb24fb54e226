use serde::Serialize;
use std::collections::HashMap;

use crate::bom_tree::{scaled_quantity, BomTree, NodeKind};
use crate::catalog::Catalog;

/// Which layers of a resolved tree to sum up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// Every node at every depth
    All,
    /// The root's direct materials, with ship hulls replaced by their own inputs
    Intermediate,
    /// Nodes that are not manufactured
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialTotal {
    pub name: String,
    pub quantity: u64,
}

/// Summed quantities per material name, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterialTotals {
    entries: Vec<MaterialTotal>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl MaterialTotals {
    pub fn add(&mut self, name: &str, quantity: u64) {
        match self.positions.get(name) {
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                entry.quantity = entry.quantity.saturating_add(quantity);
            }
            None => {
                self.positions.insert(name.to_string(), self.entries.len());
                self.entries.push(MaterialTotal {
                    name: name.to_string(),
                    quantity,
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.positions.get(name).map(|&pos| self.entries[pos].quantity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialTotal> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `"<name> x<quantity>"` line per material
    pub fn to_export_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{} x{}", entry.name, format_quantity(entry.quantity)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Group digits by thousands: `1234567` -> `"1,234,567"`
pub fn format_quantity(quantity: u64) -> String {
    let digits = quantity.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Sum a tree into one of the export views.
///
/// A flat tree (nothing resolved below the direct materials) reports its
/// direct materials for both `All` and `Leaf`.
pub fn aggregate(catalog: &Catalog, tree: &BomTree, mode: AggregateMode) -> MaterialTotals {
    let mut totals = MaterialTotals::default();

    match mode {
        AggregateMode::All => {
            for node in tree.nodes() {
                totals.add(&node.name, node.quantity);
            }
        }
        AggregateMode::Leaf if tree.is_flat() => {
            for node in &tree.materials {
                totals.add(&node.name, node.quantity);
            }
        }
        AggregateMode::Leaf => {
            for node in tree.nodes().filter(|n| n.kind == NodeKind::Leaf) {
                totals.add(&node.name, node.quantity);
            }
        }
        AggregateMode::Intermediate => {
            for node in tree.materials.iter().filter(|n| !n.is_hull) {
                totals.add(&node.name, node.quantity);
            }

            // Hulls are reported by their immediate inputs
            for hull in tree.materials.iter().filter(|n| n.is_hull) {
                for line in catalog.resolve(hull.id) {
                    if let Some(quantity) = scaled_quantity(hull.quantity, &line) {
                        totals.add(&catalog.display_name(line.material_id), quantity);
                    }
                }
            }
        }
    }

    totals
}
