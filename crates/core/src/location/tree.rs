//! In-memory snapshot of the location forest.
//!
//! Built from a single `(id, parent_id, name)` read, then walked without
//! further round-trips. Both walks are bounded by `max_depth` and track
//! visited nodes, so a cycle introduced by bad data terminates with a warning
//! instead of looping.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::catalog::LocationPathEntry;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent_id: Option<i64>,
}

/// Parent/children adjacency for every location at snapshot time.
#[derive(Debug, Clone)]
pub struct LocationTree {
    nodes: HashMap<i64, Node>,
    children: HashMap<i64, Vec<i64>>,
    max_depth: usize,
}

impl LocationTree {
    /// Build the tree from `(id, parent_id, name)` rows in any order.
    pub fn from_rows<I>(rows: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>, String)>,
    {
        let mut nodes = HashMap::new();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

        for (id, parent_id, name) in rows {
            if let Some(parent_id) = parent_id {
                children.entry(parent_id).or_default().push(id);
            }
            nodes.insert(id, Node { name, parent_id });
        }

        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        Self {
            nodes,
            children,
            max_depth,
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of `id`, ascending by id.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node reachable from `root_id` via child links, excluding the root.
    ///
    /// Breadth-first, level by level; within a level nodes keep ascending id
    /// order per parent. Unknown roots have no descendants.
    pub fn descendants(&self, root_id: i64) -> Vec<i64> {
        let mut result = Vec::new();
        let mut seen: HashSet<i64> = HashSet::from([root_id]);
        let mut frontier: VecDeque<i64> = self.children_of(root_id).iter().copied().collect();
        let mut depth = 0;

        while !frontier.is_empty() {
            depth += 1;
            if depth > self.max_depth {
                warn!(
                    root_id,
                    max_depth = self.max_depth,
                    "Location descendant walk hit depth limit; tree may contain a cycle"
                );
                break;
            }

            let mut next = VecDeque::new();
            for id in frontier {
                if !seen.insert(id) {
                    warn!(location_id = id, root_id, "Location reached twice during descendant walk");
                    continue;
                }
                result.push(id);
                next.extend(self.children_of(id).iter().copied());
            }
            frontier = next;
        }

        result
    }

    /// Root-first path ending at `id`. Empty when `id` is unknown.
    pub fn path(&self, id: i64) -> Vec<LocationPathEntry> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(current_id) = current {
            let Some(node) = self.nodes.get(&current_id) else {
                break;
            };
            if !seen.insert(current_id) || path.len() >= self.max_depth {
                warn!(
                    location_id = id,
                    max_depth = self.max_depth,
                    "Location path walk stopped early; parent chain may contain a cycle"
                );
                break;
            }
            path.push(LocationPathEntry {
                id: current_id,
                name: node.name.clone(),
            });
            current = node.parent_id;
        }

        path.reverse();
        path
    }
}
