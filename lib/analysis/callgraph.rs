//! Call graphs, method dispatch, and the class-hierarchy-analysis builder.

use log::info;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::ir::{ClassId, Invoke, InvokeKind, MethodId, Program, Site, Type};
use crate::Error;

/// How a call-graph edge dispatches.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

impl From<InvokeKind> for CallKind {
    fn from(kind: InvokeKind) -> CallKind {
        match kind {
            InvokeKind::Static => CallKind::Static,
            InvokeKind::Special => CallKind::Special,
            InvokeKind::Virtual => CallKind::Virtual,
            InvokeKind::Interface => CallKind::Interface,
        }
    }
}

/// A (call site, callee) edge.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: Site,
    pub callee: MethodId,
}

/// A context-insensitive call graph. Methods and edges are recorded in
/// discovery order; both grow monotonically.
#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    entries: Vec<MethodId>,
    reachable: Vec<MethodId>,
    reachable_set: FxHashSet<MethodId>,
    call_sites: FxHashMap<MethodId, Vec<Site>>,
    edges: Vec<CallEdge>,
    edge_set: FxHashSet<(Site, MethodId)>,
    callees: FxHashMap<Site, BTreeSet<MethodId>>,
}

impl CallGraph {
    pub fn new() -> CallGraph {
        CallGraph::default()
    }

    pub fn add_entry(&mut self, method: MethodId) {
        self.entries.push(method);
    }

    pub fn entries(&self) -> &[MethodId] {
        &self.entries
    }

    /// True if the method has been marked reachable.
    pub fn contains(&self, method: MethodId) -> bool {
        self.reachable_set.contains(&method)
    }

    /// Marks a method reachable, recording its call sites. Returns false
    /// if it was already reachable.
    pub fn add_reachable(&mut self, program: &Program, method: MethodId) -> bool {
        if !self.reachable_set.insert(method) {
            return false;
        }
        self.reachable.push(method);
        let sites = program
            .method(method)
            .call_sites()
            .map(|(i, _)| Site::new(method, i))
            .collect();
        self.call_sites.insert(method, sites);
        true
    }

    /// Adds an edge. Returns false if the edge was already present.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert((edge.call_site, edge.callee)) {
            return false;
        }
        self.callees
            .entry(edge.call_site)
            .or_default()
            .insert(edge.callee);
        self.edges.push(edge);
        true
    }

    /// Reachable methods in discovery order.
    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.reachable
    }

    /// The call sites contained in a reachable method.
    pub fn call_sites_in(&self, method: MethodId) -> &[Site] {
        self.call_sites
            .get(&method)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// The callees recorded for a call site.
    pub fn callees_of(&self, call_site: Site) -> impl Iterator<Item = MethodId> + '_ {
        self.callees
            .get(&call_site)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

/// Looks up the dispatch target for a subsignature starting at the given
/// class, ascending past classes that do not declare it or declare it
/// abstract. Returns `None` if no concrete declaration is found.
pub fn dispatch(program: &Program, class: ClassId, subsignature: &str) -> Option<MethodId> {
    let mut current = Some(class);
    while let Some(c) = current {
        if let Some(method) = program.declared_method(c, subsignature) {
            if !program.method(method).is_abstract() {
                return Some(method);
            }
        }
        current = program.super_class_of(c);
    }
    None
}

/// Resolves the callee of a call site given the receiver object's type.
/// Virtual and interface calls dispatch against the receiver type; static
/// and special calls dispatch from the class named at the call site.
pub fn resolve_callee(
    program: &Program,
    recv_ty: Option<&Type>,
    invoke: &Invoke,
) -> Option<MethodId> {
    let class = match invoke.kind {
        InvokeKind::Static | InvokeKind::Special => invoke.method_ref.class,
        InvokeKind::Virtual | InvokeKind::Interface => match recv_ty {
            Some(Type::Reference(class)) => *class,
            _ => invoke.method_ref.class,
        },
    };
    dispatch(program, class, &invoke.method_ref.subsignature)
}

/// Resolves the possible targets of a call site via class-hierarchy
/// analysis.
fn resolve(program: &Program, invoke: &Invoke) -> BTreeSet<MethodId> {
    let mut targets = BTreeSet::new();
    let declared = invoke.method_ref.class;
    let subsignature = &invoke.method_ref.subsignature;

    match invoke.kind {
        InvokeKind::Static | InvokeKind::Special => {
            if let Some(method) = dispatch(program, declared, subsignature) {
                targets.insert(method);
            }
        }
        InvokeKind::Virtual | InvokeKind::Interface => {
            let mut queue = VecDeque::from([declared]);
            let mut visited = FxHashSet::default();
            while let Some(class) = queue.pop_front() {
                if !visited.insert(class) {
                    continue;
                }
                if let Some(method) = dispatch(program, class, subsignature) {
                    targets.insert(method);
                }
                queue.extend(program.direct_subclasses_of(class));
                queue.extend(program.direct_implementors_of(class));
                queue.extend(program.direct_subinterfaces_of(class));
            }
        }
    }
    targets
}

/// Builds a call graph from the program's entry method by class-hierarchy
/// analysis.
pub fn cha_call_graph(program: &Program) -> Result<CallGraph, Error> {
    let entry = program.entry_method().ok_or(Error::NoEntryMethod)?;

    let mut call_graph = CallGraph::new();
    call_graph.add_entry(entry);

    let mut worklist = VecDeque::from([entry]);
    while let Some(method) = worklist.pop_front() {
        if !call_graph.add_reachable(program, method) {
            continue;
        }
        let sites = call_graph.call_sites_in(method).to_vec();
        for site in sites {
            let invoke = program
                .invoke_at(site)
                .ok_or_else(|| Error::IrInconsistency(format!("no call site at {}", site)))?;
            for callee in resolve(program, invoke) {
                call_graph.add_edge(CallEdge {
                    kind: invoke.kind.into(),
                    call_site: site,
                    callee,
                });
                worklist.push_back(callee);
            }
        }
    }

    info!(
        "CHA call graph: {} reachable methods, {} edges",
        call_graph.reachable_methods().len(),
        call_graph.edges().len()
    );

    Ok(call_graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{MethodRef, ProgramBuilder, StmtKind};

    /// Classes A <: Object and B <: A, both declaring m(). A call through
    /// a receiver of static type A must see both A.m and B.m.
    #[test]
    fn cha_virtual_dispatch() {
        let mut builder = ProgramBuilder::new();
        let object = builder.add_class("Object", None);
        let a = builder.add_class("A", Some(object));
        let b = builder.add_class("B", Some(a));

        let mut m = builder.method(a, "m()", false);
        m.this(Type::Reference(a));
        m.stmt(StmtKind::Return { value: None });
        let a_m = m.finish();

        let mut m = builder.method(b, "m()", false);
        m.this(Type::Reference(b));
        m.stmt(StmtKind::Return { value: None });
        let b_m = m.finish();

        let main_class = builder.add_class("Main", None);
        let mut main = builder.method(main_class, "main()", true);
        let recv = main.var("a", Type::Reference(a));
        main.stmt(StmtKind::New {
            lhs: recv,
            ty: Type::Reference(a),
        });
        main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Virtual,
            method_ref: MethodRef::new(a, "m()"),
            recv: Some(recv),
            args: vec![],
            result: None,
        }));
        main.stmt(StmtKind::Return { value: None });
        let main = main.finish();
        builder.set_entry(main);
        let program = builder.finish();

        let call_graph = cha_call_graph(&program).unwrap();
        let callees: Vec<MethodId> = call_graph
            .callees_of(Site::new(main, 1))
            .collect();
        assert_eq!(callees, vec![a_m, b_m]);
        assert!(call_graph.contains(a_m));
        assert!(call_graph.contains(b_m));
    }

    /// An interface call resolves through the interface's implementors.
    #[test]
    fn cha_interface_dispatch() {
        let mut builder = ProgramBuilder::new();
        let i = builder.add_interface("I");
        let a = builder.add_class("A", None);
        builder.implement(a, i);

        let mut m = builder.method(a, "m()", false);
        m.this(Type::Reference(a));
        m.stmt(StmtKind::Return { value: None });
        let a_m = m.finish();

        let main_class = builder.add_class("Main", None);
        let mut main = builder.method(main_class, "main()", true);
        let recv = main.var("i", Type::Reference(i));
        main.stmt(StmtKind::New {
            lhs: recv,
            ty: Type::Reference(a),
        });
        let call = main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Interface,
            method_ref: MethodRef::new(i, "m()"),
            recv: Some(recv),
            args: vec![],
            result: None,
        }));
        main.stmt(StmtKind::Return { value: None });
        let main = main.finish();
        builder.set_entry(main);
        let program = builder.finish();

        let call_graph = cha_call_graph(&program).unwrap();
        let callees: Vec<MethodId> = call_graph.callees_of(Site::new(main, call)).collect();
        assert_eq!(callees, vec![a_m]);
    }

    /// Dispatch skips abstract declarations and ascends to the superclass.
    #[test]
    fn dispatch_skips_abstract() {
        let mut builder = ProgramBuilder::new();
        let base = builder.add_class("Base", None);
        let mut m = builder.method(base, "m()", false);
        m.this(Type::Reference(base));
        m.stmt(StmtKind::Return { value: None });
        let base_m = m.finish();

        let mid = builder.add_class("Mid", Some(base));
        builder.add_abstract_method(mid, "m()");
        let leaf = builder.add_class("Leaf", Some(mid));
        let program = builder.finish();

        assert_eq!(dispatch(&program, leaf, "m()"), Some(base_m));
        assert_eq!(dispatch(&program, mid, "m()"), Some(base_m));
        assert_eq!(dispatch(&program, base, "nope()"), None);
    }
}
