//! The memory graph: static content nodes and their symmetric adjacency.
//!
//! Nodes are loaded once from a JSON table and addressed by [`NodeIndex`]
//! (position in the table) everywhere else in the crate. Connections in the
//! table may be listed on one side only; the adjacency built here is always
//! symmetric.
//!
//! # Table format
//!
//! ```json
//! [
//!   { "id": "origin", "label": "Coder", "type": "root", "connections": ["a"] },
//!   { "id": "a", "label": "Lattice", "year": 2017, "type": "work",
//!     "url": "https://example.com/lattice" }
//! ]
//! ```

use crate::error::GraphError;
use crate::particle::ParticleHandle;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Position of a node in the graph's table.
pub type NodeIndex = usize;

/// Built-in table shipped with the crate.
const BUILTIN: &str = include_str!("../assets/memories.json");

/// Role of a node in the constellation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The single center node.
    Root,
    /// A dated piece of work, placed on the spiral.
    Work,
    /// An identity facet, placed at a cardinal angle near the edge.
    Identity,
}

/// One row of the content table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub connections: Vec<String>,
}

/// A record plus its runtime state.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub record: MemoryRecord,
    discovered: bool,
    /// Phase of the idle pulse, in radians.
    pub pulse_phase: f32,
    /// Constellation position once laid out.
    pub anchor: Option<Vec2>,
    /// Particle embodying this node, if spawned.
    pub particle: Option<ParticleHandle>,
}

impl MemoryNode {
    fn new(record: MemoryRecord, index: usize) -> Self {
        Self {
            record,
            discovered: false,
            pulse_phase: index as f32 * 1.7,
            anchor: None,
            particle: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn label(&self) -> &str {
        &self.record.label
    }

    pub fn kind(&self) -> NodeKind {
        self.record.kind
    }

    #[inline]
    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    /// Mark discovered. Returns `false` if it already was; never reverts.
    pub(crate) fn mark_discovered(&mut self) -> bool {
        let newly = !self.discovered;
        self.discovered = true;
        newly
    }
}

/// Node table with a symmetric adjacency index.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    nodes: Vec<MemoryNode>,
    by_id: HashMap<String, NodeIndex>,
    adjacency: Vec<BTreeSet<NodeIndex>>,
    root: NodeIndex,
}

impl MemoryGraph {
    /// Validate the records and build the adjacency index.
    pub fn new(records: Vec<MemoryRecord>) -> Result<Self, GraphError> {
        if records.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut by_id = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if by_id.insert(record.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateId(record.id.clone()));
            }
        }

        let roots: Vec<NodeIndex> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == NodeKind::Root)
            .map(|(i, _)| i)
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(GraphError::MissingRoot),
            [root] => *root,
            many => return Err(GraphError::MultipleRoots(many.len())),
        };

        let mut adjacency = vec![BTreeSet::new(); records.len()];
        for (i, record) in records.iter().enumerate() {
            for target in &record.connections {
                match by_id.get(target) {
                    Some(&j) if j != i => {
                        adjacency[i].insert(j);
                        adjacency[j].insert(i);
                    }
                    Some(_) => {}
                    None => warn!(from = %record.id, to = %target, "dropping unknown connection"),
                }
            }
        }

        let nodes = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| MemoryNode::new(r, i))
            .collect();

        Ok(Self {
            nodes,
            by_id,
            adjacency,
            root,
        })
    }

    /// Parse a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let records: Vec<MemoryRecord> = serde_json::from_str(json)?;
        Self::new(records)
    }

    /// The table bundled with the crate.
    pub fn builtin() -> Result<Self, GraphError> {
        Self::from_json(BUILTIN)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, index: NodeIndex) -> Option<&MemoryNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(index)
    }

    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [MemoryNode] {
        &mut self.nodes
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Neighbors in ascending index order.
    pub fn neighbors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.adjacency
            .get(index)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn are_adjacent(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(&b))
    }

    pub fn discovered_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.discovered).count()
    }

    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.discovered)
    }

    /// Index of the node embodied by `handle`.
    pub fn node_for_particle(&self, handle: ParticleHandle) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.particle == Some(handle))
    }
}

/// Map text to melody degrees: lowercase, keep ASCII letters, take the first
/// five, and map each to `(c - 'a') mod 12`.
pub fn string_to_melody(text: &str) -> Vec<i32> {
    text.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase())
        .take(5)
        .map(|c| (c as i32 - 'a' as i32) % 12)
        .collect()
}
