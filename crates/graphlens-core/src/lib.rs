//! Core domain types shared across the Graphlens workspace.
//!
//! The host hands the engine a [`GraphDocument`] (opaque string identifiers
//! plus directed edges) and a [`Viewport`]; the layout and analytics crates
//! answer with positions, metrics and node subsets keyed by [`NodeId`].

use petgraph::graph::{DiGraph, NodeIndex as GraphIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Geometry
// =============================================================================

/// A 2D point or vector in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Size of the host's drawing surface, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Center of the viewport.
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    /// The larger of the two dimensions, never below 1.
    pub fn extent(&self) -> f32 {
        self.width.max(self.height).max(1.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}

// =============================================================================
// Graph document
// =============================================================================

/// Opaque identifier for a node in a [`GraphDocument`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense index assigned to a node by a single simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        Self(value as u32)
    }
}

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// An ordinary data node.
    #[default]
    Instance,
    /// A type/class node. Always kept in the backbone and eligible for class repulsion.
    Type,
}

/// A node of the input document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// Structural role.
    #[serde(default)]
    pub role: NodeRole,
    /// Degree injected by the host after metrics computation; a display-size hint only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
}

impl GraphNode {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            role: NodeRole::Instance,
            degree: None,
        }
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_type(&self) -> bool {
        self.role == NodeRole::Type
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Originating node identifier.
    pub source: NodeId,
    /// Destination node identifier.
    pub target: NodeId,
    /// Relationship label ("knows", "located_in", ...).
    #[serde(default)]
    pub label: String,
    /// Optional numeric weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl GraphEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: String::new(),
            weight: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// The node/edge set handed to the engine by the host.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// All nodes, in host order.
    pub nodes: Vec<GraphNode>,
    /// All edges, in host order.
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphDocument {
    /// Creates an empty document.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node identifiers in document order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Identifiers of nodes carrying the [`NodeRole::Type`] role.
    pub fn type_nodes(&self) -> HashSet<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_type())
            .map(|n| n.id.clone())
            .collect()
    }

    /// Write the degree hint onto every node. Nodes missing from `degrees` are reset to `None`.
    pub fn attach_degrees(&mut self, degrees: &HashMap<NodeId, f64>) {
        for node in &mut self.nodes {
            node.degree = degrees.get(&node.id).copied();
        }
    }

    /// Convert to a petgraph `DiGraph` for analysis. See [`analysis_graph`].
    pub fn to_petgraph(&self) -> (DiGraph<NodeId, ()>, HashMap<NodeId, GraphIndex>) {
        analysis_graph(self.nodes.iter().map(|node| &node.id), &self.edges)
    }
}

/// Build a petgraph `DiGraph` whose node weights are the ids.
///
/// Duplicate node ids collapse onto their first occurrence and edges with an
/// endpoint outside the node set are dropped.
pub fn analysis_graph<'a, N, E>(
    nodes: N,
    edges: E,
) -> (DiGraph<NodeId, ()>, HashMap<NodeId, GraphIndex>)
where
    N: IntoIterator<Item = &'a NodeId>,
    E: IntoIterator<Item = &'a GraphEdge>,
{
    let nodes = nodes.into_iter();
    let mut graph = DiGraph::with_capacity(nodes.size_hint().0, 0);
    let mut id_to_index = HashMap::with_capacity(nodes.size_hint().0);

    for id in nodes {
        if id_to_index.contains_key(id) {
            continue;
        }
        let idx = graph.add_node(id.clone());
        id_to_index.insert(id.clone(), idx);
    }

    for edge in edges {
        if let (Some(&from_idx), Some(&to_idx)) =
            (id_to_index.get(&edge.source), id_to_index.get(&edge.target))
        {
            graph.add_edge(from_idx, to_idx, ());
        }
    }

    (graph, id_to_index)
}

/// Builder for constructing a [`GraphDocument`] incrementally.
#[derive(Debug, Default)]
pub struct GraphDocumentBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    seen: HashSet<NodeId>,
}

impl GraphDocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance node. Re-adding an existing id is a no-op.
    pub fn node(mut self, id: impl Into<NodeId>) -> Self {
        self.push_node(GraphNode::new(id));
        self
    }

    /// Add a type node. Re-adding an existing id is a no-op.
    pub fn type_node(mut self, id: impl Into<NodeId>) -> Self {
        self.push_node(GraphNode::new(id).with_role(NodeRole::Type));
        self
    }

    /// Add an edge, creating missing endpoints as instance nodes.
    pub fn edge(mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let edge = GraphEdge::new(source, target);
        self.push_node(GraphNode::new(edge.source.clone()));
        self.push_node(GraphNode::new(edge.target.clone()));
        self.edges.push(edge);
        self
    }

    pub fn build(self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    fn push_node(&mut self, node: GraphNode) {
        if self.seen.insert(node.id.clone()) {
            self.nodes.push(node);
        }
    }
}
