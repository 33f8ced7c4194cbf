//! Extracted graph: nodes, relationships, and their reference invariants

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An extracted entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within one result (e.g. "person_001")
    pub id: String,

    /// Most complete name seen for the entity
    pub name: String,

    /// Entity type
    #[serde(rename = "type")]
    pub node_type: String,

    /// Alternative names
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Short definition taken from the text
    #[serde(default)]
    pub definition: String,

    /// Attribute name to values, in reply order; values are always arrays
    #[serde(default)]
    pub attributes: IndexMap<String, Vec<String>>,
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node id
    pub source: String,

    /// Target node id
    pub target: String,

    /// Relation type
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Nodes and relationships parsed from one LLM reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted nodes, in reply order
    pub nodes: Vec<Node>,

    /// Extracted relationships, in reply order
    pub relationships: Vec<Relationship>,
}

/// Violation of the graph's reference invariants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes share an id
    DuplicateNodeId(String),

    /// A relationship endpoint names no node
    DanglingReference {
        /// Position of the relationship in the result
        index: usize,
        /// The unknown id
        id: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateNodeId(id) => write!(f, "duplicate node id '{}'", id),
            GraphError::DanglingReference { index, id } => write!(
                f,
                "relationship {} references unknown node id '{}'",
                index, id
            ),
        }
    }
}

impl std::error::Error for GraphError {}

impl ExtractionResult {
    /// Find a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check id uniqueness and that every relationship endpoint exists
    pub fn check_references(&self) -> Result<(), GraphError> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }

        for (index, rel) in self.relationships.iter().enumerate() {
            for endpoint in [&rel.source, &rel.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphError::DanglingReference {
                        index,
                        id: endpoint.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
