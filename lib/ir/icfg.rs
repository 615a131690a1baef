//! An inter-procedural control-flow graph.
//!
//! Nodes are the CFG nodes of every method reachable in a call graph.
//! Intra-procedural edges are carried over as `Normal` edges, except that
//! edges leaving a call site become `CallToReturn` edges; `Call` edges
//! connect call sites to callee entries and `Return` edges connect callee
//! exits back to the call site's successors.

use rustc_hash::FxHashMap;

use crate::analysis::callgraph::CallGraph;
use crate::ir::{MethodId, Program, Site, VarId};
use crate::Error;

/// An ICFG node: a CFG node within a method.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IcfgNode {
    pub method: MethodId,
    /// Index of the node in the method's CFG.
    pub node: usize,
}

/// The kind of an inter-procedural edge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IcfgEdgeKind {
    /// An intra-procedural edge.
    Normal,
    /// Call site to callee entry.
    Call { call_site: Site, callee: MethodId },
    /// Call site to its intra-procedural successor, bypassing the callee.
    CallToReturn { call_site: Site },
    /// Callee exit to the call site's return target.
    Return {
        call_site: Site,
        callee: MethodId,
        return_vars: Vec<VarId>,
    },
}

/// An inter-procedural edge between two ICFG node indices.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IcfgEdge {
    pub source: usize,
    pub target: usize,
    pub kind: IcfgEdgeKind,
}

/// An inter-procedural control-flow graph.
#[derive(Clone, Debug, Default)]
pub struct Icfg {
    nodes: Vec<IcfgNode>,
    index: FxHashMap<(MethodId, usize), usize>,
    edges: Vec<IcfgEdge>,
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
    entry_nodes: Vec<usize>,
}

impl Icfg {
    /// Builds the ICFG of every reachable method in the call graph.
    pub fn build(program: &Program, call_graph: &CallGraph) -> Result<Icfg, Error> {
        let mut icfg = Icfg::default();

        for &method in call_graph.reachable_methods() {
            let cfg = program.method(method).cfg();
            for node in 0..cfg.node_count() {
                let id = icfg.nodes.len();
                icfg.nodes.push(IcfgNode { method, node });
                icfg.index.insert((method, node), id);
            }
        }
        icfg.out_edges = vec![Vec::new(); icfg.nodes.len()];
        icfg.in_edges = vec![Vec::new(); icfg.nodes.len()];

        for &entry in call_graph.entries() {
            let cfg = program.method(entry).cfg();
            let node = icfg.node_of(entry, cfg.entry())?;
            icfg.entry_nodes.push(node);
        }

        // Intra-procedural edges. Edges out of call sites bypass the
        // callee as call-to-return edges.
        for &method in call_graph.reachable_methods() {
            let m = program.method(method);
            for edge in m.cfg().edges() {
                let source = icfg.node_of(method, edge.source)?;
                let target = icfg.node_of(method, edge.target)?;
                let kind = match m.cfg().node_stmt(edge.source) {
                    Some(i) if m.stmt(i).is_call() => IcfgEdgeKind::CallToReturn {
                        call_site: Site::new(method, i),
                    },
                    _ => IcfgEdgeKind::Normal,
                };
                icfg.add_edge(source, target, kind);
            }
        }

        // Call and return edges.
        for edge in call_graph.edges() {
            let site = edge.call_site;
            let callee = program.method(edge.callee);
            if callee.is_abstract() {
                continue;
            }
            let source = icfg.node_of(site.method, site.stmt)?;
            let callee_entry = icfg.node_of(edge.callee, callee.cfg().entry())?;
            icfg.add_edge(
                source,
                callee_entry,
                IcfgEdgeKind::Call {
                    call_site: site,
                    callee: edge.callee,
                },
            );

            let callee_exit = icfg.node_of(edge.callee, callee.cfg().exit())?;
            let caller_cfg = program.method(site.method).cfg();
            for return_target in caller_cfg.successors(site.stmt) {
                let target = icfg.node_of(site.method, return_target)?;
                icfg.add_edge(
                    callee_exit,
                    target,
                    IcfgEdgeKind::Return {
                        call_site: site,
                        callee: edge.callee,
                        return_vars: callee.return_vars().to_vec(),
                    },
                );
            }
        }

        Ok(icfg)
    }

    fn add_edge(&mut self, source: usize, target: usize, kind: IcfgEdgeKind) {
        let index = self.edges.len();
        self.edges.push(IcfgEdge {
            source,
            target,
            kind,
        });
        self.out_edges[source].push(index);
        self.in_edges[target].push(index);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: usize) -> IcfgNode {
        self.nodes[id]
    }

    pub fn nodes(&self) -> &[IcfgNode] {
        &self.nodes
    }

    /// The node id of a method's CFG node.
    pub fn node_of(&self, method: MethodId, cfg_node: usize) -> Result<usize, Error> {
        self.index
            .get(&(method, cfg_node))
            .copied()
            .ok_or(Error::GraphVertexNotFound(cfg_node))
    }

    /// The node id of a statement, if its method is part of this graph.
    pub fn stmt_node(&self, site: Site) -> Option<usize> {
        self.index.get(&(site.method, site.stmt)).copied()
    }

    /// The entry node of each entry method.
    pub fn entry_nodes(&self) -> &[usize] {
        &self.entry_nodes
    }

    pub fn out_edges_of(&self, node: usize) -> impl Iterator<Item = &IcfgEdge> {
        self.out_edges[node].iter().map(move |&i| &self.edges[i])
    }

    pub fn in_edges_of(&self, node: usize) -> impl Iterator<Item = &IcfgEdge> {
        self.in_edges[node].iter().map(move |&i| &self.edges[i])
    }
}
