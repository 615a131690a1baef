//! A per-method control-flow graph over statement indices.
//!
//! Nodes are the method's statements plus a synthetic entry and exit.
//! Edges carry kinds so that branch-pruning analyses can tell which
//! successor corresponds to which branch outcome; multiple edges of
//! different kinds may connect the same pair of nodes.

use serde::{Deserialize, Serialize};

use crate::ir::MethodId;

/// The kind of a control-flow edge.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CfgEdgeKind {
    /// Fall-through, entry, and return-to-exit edges.
    Normal,
    Goto,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
}

/// A control-flow edge between two node indices.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CfgEdge {
    pub source: usize,
    pub target: usize,
    pub kind: CfgEdgeKind,
}

/// A control-flow graph. Statement `i` is node `i`; the entry is node
/// `stmt_count` and the exit is node `stmt_count + 1`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cfg {
    method: MethodId,
    stmt_count: usize,
    edges: Vec<CfgEdge>,
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
}

impl Cfg {
    pub(crate) fn new(method: MethodId, stmt_count: usize) -> Cfg {
        let node_count = stmt_count + 2;
        Cfg {
            method,
            stmt_count,
            edges: Vec::new(),
            out_edges: vec![Vec::new(); node_count],
            in_edges: vec![Vec::new(); node_count],
        }
    }

    pub(crate) fn add_edge(&mut self, source: usize, target: usize, kind: CfgEdgeKind) {
        let index = self.edges.len();
        self.edges.push(CfgEdge {
            source,
            target,
            kind,
        });
        self.out_edges[source].push(index);
        self.in_edges[target].push(index);
    }

    /// The method this graph belongs to.
    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn node_count(&self) -> usize {
        self.stmt_count + 2
    }

    /// The synthetic entry node.
    pub fn entry(&self) -> usize {
        self.stmt_count
    }

    /// The synthetic exit node.
    pub fn exit(&self) -> usize {
        self.stmt_count + 1
    }

    /// The statement index of a node, or `None` for entry/exit.
    pub fn node_stmt(&self, node: usize) -> Option<usize> {
        if node < self.stmt_count {
            Some(node)
        } else {
            None
        }
    }

    /// Every outgoing edge of a node.
    pub fn out_edges(&self, node: usize) -> impl Iterator<Item = &CfgEdge> {
        self.out_edges[node].iter().map(move |&i| &self.edges[i])
    }

    /// Every incoming edge of a node.
    pub fn in_edges(&self, node: usize) -> impl Iterator<Item = &CfgEdge> {
        self.in_edges[node].iter().map(move |&i| &self.edges[i])
    }

    /// The indices of a node's successors, in edge insertion order.
    pub fn successors(&self, node: usize) -> Vec<usize> {
        self.out_edges(node).map(|e| e.target).collect()
    }

    /// The indices of a node's predecessors, in edge insertion order.
    pub fn predecessors(&self, node: usize) -> Vec<usize> {
        self.in_edges(node).map(|e| e.source).collect()
    }

    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }
}
