use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::error::Result;

struct Node {
    name: String,
    parent_id: Option<i64>,
}

/// In-memory arena over the ledger's category forest.
///
/// Categories are optional external input: an empty or missing table yields
/// an empty taxonomy, which excludes nothing.
pub struct Taxonomy {
    nodes: HashMap<i64, Node>,
    // category id -> root ancestor id, resolved once at load time
    roots: HashMap<i64, i64>,
}

impl Taxonomy {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT id, name, parent_id FROM categories")?;
        let rows: Vec<(i64, String, Option<i64>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut nodes = HashMap::new();
        for (id, name, parent_id) in rows {
            nodes.insert(id, Node { name, parent_id });
        }

        let mut roots = HashMap::new();
        for &id in nodes.keys() {
            roots.insert(id, resolve_root(&nodes, id));
        }

        Ok(Self { nodes, roots })
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Chain from the category itself up to its root, in order.
    /// A malformed parent chain (cycle or dangling reference) ends the walk
    /// at the last sound node.
    #[allow(dead_code)]
    pub fn ancestors(&self, id: i64) -> Vec<i64> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if !seen.insert(c) {
                break;
            }
            let Some(node) = self.nodes.get(&c) else {
                break;
            };
            chain.push(c);
            current = node.parent_id;
        }
        chain
    }

    /// Name of the root ancestor, the value exclusions are matched against.
    pub fn root_name(&self, id: i64) -> Option<&str> {
        let root = self.roots.get(&id)?;
        self.nodes.get(root).map(|n| n.name.as_str())
    }

    /// Build the exclusion predicate for a set of root-name keywords.
    ///
    /// A category is excluded when its root ancestor's name contains any of
    /// the keywords, case-insensitively. Exclusion therefore propagates to
    /// every descendant of an excluded root, including subcategories added
    /// after the keyword list was written.
    pub fn excluder(&self, root_keywords: &[String]) -> Excluder {
        let keywords: Vec<String> = root_keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut excluded = HashSet::new();
        for &id in self.nodes.keys() {
            if let Some(root) = self.root_name(id) {
                let root_lower = root.to_lowercase();
                if keywords.iter().any(|k| root_lower.contains(k.as_str())) {
                    excluded.insert(id);
                }
            }
        }
        Excluder { excluded }
    }
}

fn resolve_root(nodes: &HashMap<i64, Node>, id: i64) -> i64 {
    let mut seen = HashSet::new();
    let mut current = id;
    loop {
        if !seen.insert(current) {
            // Cycle: treat the entry point as its own root.
            return id;
        }
        match nodes.get(&current).and_then(|n| n.parent_id) {
            Some(parent) if nodes.contains_key(&parent) => current = parent,
            _ => return current,
        }
    }
}

/// Membership predicate over optional category ids.
pub struct Excluder {
    excluded: HashSet<i64>,
}

impl Excluder {
    /// Splits without a category are not excluded here; the aggregation
    /// layer applies its own name heuristics to those.
    pub fn is_excluded(&self, category_id: Option<i64>) -> bool {
        match category_id {
            Some(id) => self.excluded.contains(&id),
            None => false,
        }
    }

    #[cfg(test)]
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}
