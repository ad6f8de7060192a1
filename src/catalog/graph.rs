//! Join resolution over the relationship graph.
//!
//! Both the SQL compiler and the in-memory engine resolve joins through the
//! same [`JoinPlan`], so a table that cannot be connected is dropped
//! identically on both sides. The drop is silent by design (preview-only
//! semantics): callers that want to fail loud can inspect
//! [`JoinPlan::dropped`].

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::{Catalog, JoinKind, Relationship, TableKind};

/// One resolved join step: `kind JOIN table ON source = target`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJoin {
    /// The table being brought into the join set.
    pub table: String,
    pub kind: JoinKind,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// The outcome of join resolution for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlan {
    /// Base table of the FROM chain. `None` when no tables were required.
    pub base: Option<String>,
    /// Join steps in emission order.
    pub joins: Vec<ResolvedJoin>,
    /// Required tables with no edge into the join set. These appear in no
    /// FROM/JOIN clause even though their columns may still be referenced.
    pub dropped: Vec<String>,
}

/// Relationship graph over table names.
pub struct JoinGraph<'a> {
    catalog: &'a Catalog,
    graph: DiGraph<String, usize>,
    nodes: HashMap<String, NodeIndex>,
}

impl<'a> JoinGraph<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for table in &catalog.tables {
            let idx = graph.add_node(table.name.clone());
            nodes.insert(table.name.clone(), idx);
        }

        for (i, rel) in catalog.relationships.iter().enumerate() {
            if let (Some(&src), Some(&dst)) =
                (nodes.get(&rel.source_table), nodes.get(&rel.target_table))
            {
                graph.add_edge(src, dst, i);
            }
        }

        Self {
            catalog,
            graph,
            nodes,
        }
    }

    /// Resolve the join chain for a set of required tables.
    ///
    /// The base table is the most fact-like table present: among required
    /// fact tables, the one with the most outgoing relationship edges (the
    /// many side of its joins, i.e. the finest grain), declaration order
    /// breaking ties. Falls back to the first required table.
    ///
    /// Every other required table is connected through a single relationship
    /// edge touching the already-joined set; edges are considered in
    /// declaration order and traversed in either direction. Tables with no
    /// such edge are recorded in `dropped`.
    pub fn resolve(&self, required: &[String]) -> JoinPlan {
        let Some(base) = self.pick_base(required) else {
            return JoinPlan::default();
        };

        let mut joined: HashSet<&str> = HashSet::new();
        joined.insert(base);

        let mut joins = Vec::new();
        let mut dropped = Vec::new();

        for table in required {
            if table == base {
                continue;
            }
            match self.edge_into_set(table, &joined) {
                Some(rel) => {
                    joins.push(ResolvedJoin {
                        table: table.clone(),
                        kind: rel.join_kind,
                        source_table: rel.source_table.clone(),
                        source_column: rel.source_column.clone(),
                        target_table: rel.target_table.clone(),
                        target_column: rel.target_column.clone(),
                    });
                    joined.insert(table);
                }
                None => dropped.push(table.clone()),
            }
        }

        JoinPlan {
            base: Some(base.to_string()),
            joins,
            dropped,
        }
    }

    fn pick_base(&self, required: &'a [String]) -> Option<&'a str> {
        let mut best: Option<(&str, usize, usize)> = None;

        for (decl_order, table) in self.catalog.tables.iter().enumerate() {
            if table.kind != TableKind::Fact || !required.contains(&table.name) {
                continue;
            }
            let out_degree = self
                .nodes
                .get(&table.name)
                .map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
                .unwrap_or(0);

            let better = match best {
                None => true,
                Some((_, best_deg, best_order)) => {
                    out_degree > best_deg || (out_degree == best_deg && decl_order < best_order)
                }
            };
            if better {
                // Borrow the name from `required` so the lifetime follows the input.
                let name = required.iter().find(|n| **n == table.name)?;
                best = Some((name, out_degree, decl_order));
            }
        }

        best.map(|(name, _, _)| name)
            .or_else(|| required.first().map(|s| s.as_str()))
    }

    /// First declared relationship connecting `table` to the joined set,
    /// in either direction.
    fn edge_into_set(&self, table: &str, joined: &HashSet<&str>) -> Option<&Relationship> {
        let idx = *self.nodes.get(table)?;

        let mut candidate: Option<usize> = None;
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, direction) {
                let rel = &self.catalog.relationships[*edge.weight()];
                let Some(other) = rel.other_end(table) else {
                    continue;
                };
                if joined.contains(other) && candidate.map_or(true, |c| *edge.weight() < c) {
                    candidate = Some(*edge.weight());
                }
            }
        }

        candidate.map(|i| &self.catalog.relationships[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnRole, ColumnType, Table};

    fn shop_catalog() -> Catalog {
        let key = |n: &str| Column::new(n, ColumnType::Text, ColumnRole::Key);
        Catalog::new(
            vec![
                Table::new("customers", TableKind::Dimension, vec![key("id")]),
                Table::new("products", TableKind::Dimension, vec![key("id")]),
                Table::new("orders", TableKind::Fact, vec![key("id"), key("customer_id")]),
                Table::new(
                    "order_items",
                    TableKind::Fact,
                    vec![key("id"), key("order_id"), key("product_id")],
                ),
            ],
            vec![
                Relationship::new("rel-1", "orders", "customer_id", "customers", "id", JoinKind::Left),
                Relationship::new("rel-2", "order_items", "order_id", "orders", "id", JoinKind::Left),
                Relationship::new("rel-3", "order_items", "product_id", "products", "id", JoinKind::Left),
            ],
        )
    }

    #[test]
    fn test_base_prefers_finest_grain_fact() {
        let catalog = shop_catalog();
        let graph = JoinGraph::new(&catalog);

        let plan = graph.resolve(&["orders".into(), "order_items".into()]);
        assert_eq!(plan.base.as_deref(), Some("order_items"));

        let plan = graph.resolve(&["customers".into(), "orders".into()]);
        assert_eq!(plan.base.as_deref(), Some("orders"));
    }

    #[test]
    fn test_base_falls_back_to_first_required() {
        let catalog = shop_catalog();
        let graph = JoinGraph::new(&catalog);

        let plan = graph.resolve(&["customers".into(), "products".into()]);
        assert_eq!(plan.base.as_deref(), Some("customers"));
    }

    #[test]
    fn test_join_chain_through_accumulated_set() {
        let catalog = shop_catalog();
        let graph = JoinGraph::new(&catalog);

        let plan = graph.resolve(&[
            "order_items".into(),
            "orders".into(),
            "customers".into(),
        ]);
        assert_eq!(plan.base.as_deref(), Some("order_items"));
        assert_eq!(plan.joins.len(), 2);
        assert_eq!(plan.joins[0].table, "orders");
        assert_eq!(plan.joins[1].table, "customers");
        // customers attaches through orders, not order_items
        assert_eq!(plan.joins[1].source_table, "orders");
        assert!(plan.dropped.is_empty());
    }

    #[test]
    fn test_unreachable_table_is_dropped() {
        let mut catalog = shop_catalog();
        catalog.tables.push(Table::new(
            "islands",
            TableKind::Dimension,
            vec![Column::new("id", ColumnType::Text, ColumnRole::Key)],
        ));
        let graph = JoinGraph::new(&catalog);

        let plan = graph.resolve(&["orders".into(), "islands".into()]);
        assert_eq!(plan.base.as_deref(), Some("orders"));
        assert!(plan.joins.is_empty());
        assert_eq!(plan.dropped, vec!["islands".to_string()]);
    }

    #[test]
    fn test_empty_required_set() {
        let catalog = shop_catalog();
        let graph = JoinGraph::new(&catalog);
        assert_eq!(graph.resolve(&[]), JoinPlan::default());
    }
}
