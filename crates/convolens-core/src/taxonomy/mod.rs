//! Category taxonomy
//!
//! Three-level category tree built once at process start from a tabular
//! source and queried read-only by the classifier. Children keep their
//! declared order; the classifier's deterministic fallback is the first
//! candidate in that order.

mod loader;

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::warn;

pub use loader::load_taxonomy;

/// One typed row of the tabular category source.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: u32,
    pub name: String,
    pub parent_id: u32,
    pub level: u8,
}

/// Taxonomy errors
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("taxonomy has no level-1 categories")]
    Empty,
}

#[derive(Debug)]
struct Level1Node {
    id: u32,
    name: String,
    children: Vec<String>,
}

#[derive(Debug)]
struct Level2Node {
    id: u32,
    children: Vec<String>,
}

/// In-memory category tree. Shared read-only across concurrent requests.
#[derive(Debug)]
pub struct Taxonomy {
    level1: Vec<Level1Node>,
    level2: HashMap<String, Level2Node>,
    level3_parents: HashSet<String>,
}

impl Taxonomy {
    /// Build the tree from typed rows. Rows are processed level 1 → 2 → 3
    /// so parent lookups always resolve against already-inserted nodes;
    /// rows referencing an unknown parent are skipped.
    pub fn from_rows(
        rows: Vec<CategoryRow>,
        level3_parents: impl IntoIterator<Item = String>,
    ) -> Result<Self, TaxonomyError> {
        let mut taxonomy = Self {
            level1: Vec::new(),
            level2: HashMap::new(),
            level3_parents: level3_parents.into_iter().collect(),
        };

        for level in [1u8, 2, 3] {
            for row in rows.iter().filter(|row| row.level == level) {
                taxonomy.insert(row);
            }
        }

        if taxonomy.level1.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        Ok(taxonomy)
    }

    fn insert(&mut self, row: &CategoryRow) {
        match row.level {
            1 => self.level1.push(Level1Node {
                id: row.id,
                name: row.name.clone(),
                children: Vec::new(),
            }),
            2 => {
                let Some(parent) = self.level1.iter_mut().find(|n| n.id == row.parent_id) else {
                    warn!(name = %row.name, parent_id = row.parent_id, "level-2 row with unknown parent, skipped");
                    return;
                };
                parent.children.push(row.name.clone());
                self.level2.insert(
                    row.name.clone(),
                    Level2Node {
                        id: row.id,
                        children: Vec::new(),
                    },
                );
            }
            3 => {
                let Some(parent) = self
                    .level2
                    .values_mut()
                    .find(|node| node.id == row.parent_id)
                else {
                    warn!(name = %row.name, parent_id = row.parent_id, "level-3 row with unknown parent, skipped");
                    return;
                };
                parent.children.push(row.name.clone());
            }
            other => {
                warn!(name = %row.name, level = other, "row with unsupported level, skipped");
            }
        }
    }

    /// Level-1 category names in declared order.
    pub fn level1_names(&self) -> Vec<String> {
        self.level1.iter().map(|n| n.name.clone()).collect()
    }

    /// Level-2 children of a level-1 category, in declared order.
    pub fn level2_children(&self, level1_name: &str) -> Vec<String> {
        self.level1
            .iter()
            .find(|n| n.name == level1_name)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Level-3 children of a level-2 category, in declared order.
    pub fn level3_children(&self, level2_name: &str) -> Vec<String> {
        self.level2
            .get(level2_name)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Whether a level-2 category requires a third classification level.
    /// Configuration, not a structural property of the tree.
    pub fn requires_level3(&self, level2_name: &str) -> bool {
        self.level3_parents.contains(level2_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u32, name: &str, parent_id: u32, level: u8) -> CategoryRow {
        CategoryRow {
            id,
            name: name.to_string(),
            parent_id,
            level,
        }
    }

    fn sample_rows() -> Vec<CategoryRow> {
        vec![
            row(1, "费用异议咨询", 0, 1),
            row(2, "其他", 0, 1),
            row(10, "飞享会员", 1, 2),
            row(11, "利息异议", 1, 2),
            row(20, "取消扣款", 10, 3),
            row(21, "取消续费", 10, 3),
        ]
    }

    fn sample_taxonomy() -> Taxonomy {
        Taxonomy::from_rows(sample_rows(), ["飞享会员".to_string()]).unwrap()
    }

    #[test]
    fn test_level1_names_keep_declared_order() {
        let taxonomy = sample_taxonomy();
        assert_eq!(taxonomy.level1_names(), vec!["费用异议咨询", "其他"]);
    }

    #[test]
    fn test_level2_children_resolved_by_parent_id() {
        let taxonomy = sample_taxonomy();
        assert_eq!(
            taxonomy.level2_children("费用异议咨询"),
            vec!["飞享会员", "利息异议"]
        );
        assert!(taxonomy.level2_children("其他").is_empty());
        assert!(taxonomy.level2_children("不存在").is_empty());
    }

    #[test]
    fn test_level3_children_attach_to_level2_node() {
        let taxonomy = sample_taxonomy();
        assert_eq!(
            taxonomy.level3_children("飞享会员"),
            vec!["取消扣款", "取消续费"]
        );
        assert!(taxonomy.level3_children("利息异议").is_empty());
    }

    #[test]
    fn test_requires_level3_is_configuration_driven() {
        let taxonomy = sample_taxonomy();
        assert!(taxonomy.requires_level3("飞享会员"));
        // Has no level-3 children either way, but the flag comes from the
        // configured parent set, not the tree shape.
        assert!(!taxonomy.requires_level3("利息异议"));
    }

    #[test]
    fn test_orphan_rows_skipped() {
        let mut rows = sample_rows();
        rows.push(row(30, "孤儿分类", 99, 2));
        let taxonomy = Taxonomy::from_rows(rows, []).unwrap();
        assert!(taxonomy.level2_children("孤儿分类").is_empty());
        assert!(!taxonomy
            .level1_names()
            .iter()
            .any(|name| name == "孤儿分类"));
    }

    #[test]
    fn test_rows_out_of_level_order_still_build() {
        let mut rows = sample_rows();
        rows.reverse();
        let taxonomy = Taxonomy::from_rows(rows, ["飞享会员".to_string()]).unwrap();
        assert_eq!(
            taxonomy.level3_children("飞享会员"),
            vec!["取消续费", "取消扣款"]
        );
    }

    #[test]
    fn test_empty_taxonomy_is_an_error() {
        assert!(matches!(
            Taxonomy::from_rows(Vec::new(), []),
            Err(TaxonomyError::Empty)
        ));
    }
}
