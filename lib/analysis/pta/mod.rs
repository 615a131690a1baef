//! Inclusion-based pointer analyses.
//!
//! Both the context-insensitive ([`ci`]) and context-sensitive ([`cs`])
//! variants are work-list fixpoints over a pointer-flow graph: an edge
//! `src -> tgt` constrains every object in pt(src) to be in pt(tgt), and
//! the call graph is built on the fly from receiver points-to sets.

pub mod ci;
pub mod context;
pub mod cs;
pub mod heap;
pub mod taint;

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::analysis::callgraph::CallGraph;
use crate::graph::{self, NullEdge, NullVertex};
use crate::ir::{FieldId, MethodId, VarId};
use crate::Error;

pub use self::heap::{HeapModel, Obj, ObjId, ObjKind};

/// A monotonically growing, ordered set of abstract objects.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PointsToSet<T: Copy + Ord> {
    objects: BTreeSet<T>,
}

impl<T: Copy + Ord> PointsToSet<T> {
    pub fn new() -> PointsToSet<T> {
        PointsToSet {
            objects: BTreeSet::new(),
        }
    }

    pub fn singleton(obj: T) -> PointsToSet<T> {
        let mut set = PointsToSet::new();
        set.add(obj);
        set
    }

    /// Adds an object; returns true if it was new.
    pub fn add(&mut self, obj: T) -> bool {
        self.objects.insert(obj)
    }

    pub fn contains(&self, obj: T) -> bool {
        self.objects.contains(&obj)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.objects.iter().copied()
    }
}

impl<T: Copy + Ord> Default for PointsToSet<T> {
    fn default() -> PointsToSet<T> {
        PointsToSet::new()
    }
}

/// The pointer-flow graph: a subset-constraint graph over interned
/// pointer indices. Edges persist once added.
#[derive(Clone, Debug, Default)]
pub struct Pfg {
    graph: graph::Graph<NullVertex, NullEdge>,
}

impl Pfg {
    pub fn new() -> Pfg {
        Pfg::default()
    }

    /// Adds an edge; returns true if it was new.
    pub fn add_edge(&mut self, source: usize, target: usize) -> Result<bool, Error> {
        if self.graph.has_edge(source, target) {
            return Ok(false);
        }
        if !self.graph.has_vertex(source) {
            self.graph.insert_vertex(NullVertex::new(source))?;
        }
        if !self.graph.has_vertex(target) {
            self.graph.insert_vertex(NullVertex::new(target))?;
        }
        self.graph.insert_edge(NullEdge::new(source, target))?;
        Ok(true)
    }

    /// Successor pointer indices of a pointer.
    pub fn successors(&self, pointer: usize) -> Vec<usize> {
        if self.graph.has_vertex(pointer) {
            self.graph.successor_indices(pointer).unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Every (source, target) edge.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .edges()
            .into_iter()
            .map(|e| {
                use crate::graph::Edge;
                (e.head(), e.tail())
            })
            .collect()
    }
}

/// The published result of a pointer analysis, context-collapsed.
#[derive(Clone, Debug, Default)]
pub struct PtaResult {
    pub(crate) heap: HeapModel,
    pub(crate) var_points_to: FxHashMap<VarId, PointsToSet<ObjId>>,
    pub(crate) instance_field_points_to: FxHashMap<(ObjId, FieldId), PointsToSet<ObjId>>,
    pub(crate) static_field_points_to: FxHashMap<FieldId, PointsToSet<ObjId>>,
    pub(crate) array_points_to: FxHashMap<ObjId, PointsToSet<ObjId>>,
    pub(crate) call_graph: CallGraph,
    pub(crate) empty: PointsToSet<ObjId>,
}

impl PtaResult {
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    /// The points-to set of a variable.
    pub fn points_to(&self, var: VarId) -> &PointsToSet<ObjId> {
        self.var_points_to.get(&var).unwrap_or(&self.empty)
    }

    /// The points-to set of an instance field of an object.
    pub fn field_points_to(&self, obj: ObjId, field: FieldId) -> &PointsToSet<ObjId> {
        self.instance_field_points_to
            .get(&(obj, field))
            .unwrap_or(&self.empty)
    }

    /// The points-to set of a static field.
    pub fn static_points_to(&self, field: FieldId) -> &PointsToSet<ObjId> {
        self.static_field_points_to
            .get(&field)
            .unwrap_or(&self.empty)
    }

    /// The merged points-to set of an array object's elements.
    pub fn array_points_to(&self, obj: ObjId) -> &PointsToSet<ObjId> {
        self.array_points_to.get(&obj).unwrap_or(&self.empty)
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn reachable_methods(&self) -> &[MethodId] {
        self.call_graph.reachable_methods()
    }

    /// Every variable with a non-empty points-to set, in id order.
    pub fn vars(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = self.var_points_to.keys().copied().collect();
        vars.sort();
        vars
    }
}
