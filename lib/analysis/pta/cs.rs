//! Context-sensitive inclusion-based pointer analysis.
//!
//! The solver has the same structure as the context-insensitive variant:
//! variables, objects, call sites, and methods are qualified with contexts
//! chosen by a [`ContextSelector`], and an optional taint configuration
//! hooks into call processing (sources and transfers) and into the final
//! sweep (sinks).

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};

use crate::analysis::callgraph::{self, CallEdge, CallGraph, CallKind};
use crate::analysis::pta::context::{Context, ContextSelector};
use crate::analysis::pta::taint::{TaintConfig, TaintFlow, TaintManager, Transfer, TransferPoint};
use crate::analysis::pta::{HeapModel, ObjId, Pfg, PointsToSet, PtaResult};
use crate::ir::{Exp, FieldId, Invoke, InvokeKind, MethodId, Program, Site, StmtKind, VarId};
use crate::Error;

/// The index of an interned (context, object) pair.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CsObjId(pub usize);

impl CsObjId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A method qualified with a calling context.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CsMethod {
    pub context: Context,
    pub method: MethodId,
}

/// A call site qualified with the caller's context.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CsCallSite {
    pub context: Context,
    pub site: Site,
}

/// A context-sensitive call-graph edge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CsCallEdge {
    pub kind: CallKind,
    pub call_site: CsCallSite,
    pub callee: CsMethod,
}

/// A context-sensitive call graph.
#[derive(Clone, Debug, Default)]
pub struct CsCallGraph {
    entries: Vec<CsMethod>,
    reachable: Vec<CsMethod>,
    reachable_set: FxHashSet<CsMethod>,
    edges: Vec<CsCallEdge>,
    edge_set: FxHashSet<(CsCallSite, CsMethod)>,
    callees: FxHashMap<CsCallSite, BTreeSet<CsMethod>>,
}

impl CsCallGraph {
    pub fn add_entry(&mut self, method: CsMethod) {
        self.entries.push(method);
    }

    pub fn entries(&self) -> &[CsMethod] {
        &self.entries
    }

    pub fn contains(&self, method: &CsMethod) -> bool {
        self.reachable_set.contains(method)
    }

    /// Marks a context-sensitive method reachable. Returns false if it
    /// already was.
    pub fn add_reachable(&mut self, method: CsMethod) -> bool {
        if !self.reachable_set.insert(method.clone()) {
            return false;
        }
        self.reachable.push(method);
        true
    }

    /// Adds an edge. Returns false if the edge was already present.
    pub fn add_edge(&mut self, edge: CsCallEdge) -> bool {
        if !self
            .edge_set
            .insert((edge.call_site.clone(), edge.callee.clone()))
        {
            return false;
        }
        self.callees
            .entry(edge.call_site.clone())
            .or_default()
            .insert(edge.callee.clone());
        self.edges.push(edge);
        true
    }

    pub fn reachable_methods(&self) -> &[CsMethod] {
        &self.reachable
    }

    pub fn edges(&self) -> &[CsCallEdge] {
        &self.edges
    }

    pub fn callees_of(&self, call_site: &CsCallSite) -> impl Iterator<Item = &CsMethod> {
        self.callees
            .get(call_site)
            .into_iter()
            .flat_map(|set| set.iter())
    }
}

/// A node of the context-sensitive pointer-flow graph.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum CsPointer {
    Var(Context, VarId),
    InstanceField(CsObjId, FieldId),
    StaticField(FieldId),
    ArrayIndex(CsObjId),
}

/// The published result of the context-sensitive analysis: the
/// context-collapsed view, the context-sensitive call graph, and any
/// taint flows.
#[derive(Clone, Debug)]
pub struct CsPtaResult {
    collapsed: PtaResult,
    cs_call_graph: CsCallGraph,
    taint_flows: BTreeSet<TaintFlow>,
}

impl CsPtaResult {
    /// The context-collapsed view of this result.
    pub fn as_pta(&self) -> &PtaResult {
        &self.collapsed
    }

    pub fn into_pta(self) -> PtaResult {
        self.collapsed
    }

    pub fn points_to(&self, var: VarId) -> &PointsToSet<ObjId> {
        self.collapsed.points_to(var)
    }

    pub fn heap(&self) -> &HeapModel {
        self.collapsed.heap()
    }

    pub fn cs_call_graph(&self) -> &CsCallGraph {
        &self.cs_call_graph
    }

    /// Taint flows, ordered by (source, sink, index).
    pub fn taint_flows(&self) -> &BTreeSet<TaintFlow> {
        &self.taint_flows
    }
}

/// Runs the context-sensitive pointer analysis from the program's entry
/// method.
pub fn solve<S: ContextSelector>(program: &Program, selector: &S) -> Result<CsPtaResult, Error> {
    Solver::new(program, selector, None).solve()
}

/// Runs the context-sensitive pointer analysis with a taint overlay.
pub fn solve_with_taint<S: ContextSelector>(
    program: &Program,
    selector: &S,
    config: TaintConfig,
) -> Result<CsPtaResult, Error> {
    Solver::new(program, selector, Some(config)).solve()
}

struct TaintState {
    config: TaintConfig,
    manager: TaintManager,
    /// Call sites where each variable occurs as an argument.
    arg_sites: FxHashMap<VarId, Vec<Site>>,
}

struct Solver<'a, S: ContextSelector> {
    program: &'a Program,
    selector: &'a S,
    heap: HeapModel,
    pointers: FxHashMap<CsPointer, usize>,
    pointer_info: Vec<(CsPointer, PointsToSet<CsObjId>)>,
    cs_objs: FxHashMap<(Context, ObjId), CsObjId>,
    cs_obj_info: Vec<(Context, ObjId)>,
    pfg: Pfg,
    call_graph: CsCallGraph,
    worklist: VecDeque<(usize, PointsToSet<CsObjId>)>,
    taint: Option<TaintState>,
}

impl<'a, S: ContextSelector> Solver<'a, S> {
    fn new(program: &'a Program, selector: &'a S, config: Option<TaintConfig>) -> Solver<'a, S> {
        let taint = config.map(|config| {
            let mut arg_sites: FxHashMap<VarId, Vec<Site>> = FxHashMap::default();
            for (m, method) in program.methods().iter().enumerate() {
                for (i, invoke) in method.call_sites() {
                    for &arg in &invoke.args {
                        arg_sites
                            .entry(arg)
                            .or_default()
                            .push(Site::new(MethodId(m), i));
                    }
                }
            }
            TaintState {
                config,
                manager: TaintManager::new(),
                arg_sites,
            }
        });

        Solver {
            program,
            selector,
            heap: HeapModel::new(),
            pointers: FxHashMap::default(),
            pointer_info: Vec::new(),
            cs_objs: FxHashMap::default(),
            cs_obj_info: Vec::new(),
            pfg: Pfg::new(),
            call_graph: CsCallGraph::default(),
            worklist: VecDeque::new(),
            taint,
        }
    }

    fn solve(mut self) -> Result<CsPtaResult, Error> {
        let entry = self.program.entry_method().ok_or(Error::NoEntryMethod)?;
        let entry = CsMethod {
            context: self.selector.empty_context(),
            method: entry,
        };
        self.call_graph.add_entry(entry.clone());
        self.add_reachable(entry)?;
        self.analyze()?;

        let taint_flows = self.collect_taint_flows();
        info!(
            "context-sensitive pointer analysis: {} pointers, {} cs objects, {} reachable cs methods, {} taint flows",
            self.pointer_info.len(),
            self.cs_obj_info.len(),
            self.call_graph.reachable_methods().len(),
            taint_flows.len()
        );

        Ok(self.into_result(taint_flows))
    }

    fn pointer(&mut self, pointer: CsPointer) -> usize {
        if let Some(&index) = self.pointers.get(&pointer) {
            return index;
        }
        let index = self.pointer_info.len();
        self.pointers.insert(pointer.clone(), index);
        self.pointer_info.push((pointer, PointsToSet::new()));
        index
    }

    fn cs_obj(&mut self, context: &Context, obj: ObjId) -> CsObjId {
        let key = (context.clone(), obj);
        if let Some(&id) = self.cs_objs.get(&key) {
            return id;
        }
        let id = CsObjId(self.cs_obj_info.len());
        self.cs_obj_info.push(key.clone());
        self.cs_objs.insert(key, id);
        id
    }

    fn add_pfg_edge(&mut self, source: CsPointer, target: CsPointer) -> Result<(), Error> {
        let source = self.pointer(source);
        let target = self.pointer(target);
        if self.pfg.add_edge(source, target)? {
            let pts = self.pointer_info[source].1.clone();
            if !pts.is_empty() {
                self.worklist.push_back((target, pts));
            }
        }
        Ok(())
    }

    /// Processes a newly reachable context-sensitive method's statements.
    fn add_reachable(&mut self, cs_method: CsMethod) -> Result<(), Error> {
        if !self.call_graph.add_reachable(cs_method.clone()) {
            return Ok(());
        }
        let CsMethod { context, method } = cs_method;
        debug!(
            "reachable: {} under {}",
            self.program.method(method).subsignature(),
            context
        );

        let program = self.program;
        for (i, stmt) in program.method(method).stmts().iter().enumerate() {
            match *stmt.kind() {
                StmtKind::New { lhs, ref ty } => {
                    let obj = self.heap.obj_at(Site::new(method, i), ty);
                    let heap_context = self.selector.select_heap_context(&context, method, obj);
                    let cs_obj = self.cs_obj(&heap_context, obj);
                    let pointer = self.pointer(CsPointer::Var(context.clone(), lhs));
                    self.worklist
                        .push_back((pointer, PointsToSet::singleton(cs_obj)));
                }
                StmtKind::Assign {
                    lhs,
                    rhs: Exp::Var(rhs),
                } => {
                    self.add_pfg_edge(
                        CsPointer::Var(context.clone(), rhs),
                        CsPointer::Var(context.clone(), lhs),
                    )?;
                }
                StmtKind::LoadField {
                    lhs,
                    base: None,
                    field,
                } => {
                    self.add_pfg_edge(
                        CsPointer::StaticField(field),
                        CsPointer::Var(context.clone(), lhs),
                    )?;
                }
                StmtKind::StoreField {
                    base: None,
                    field,
                    rhs,
                } => {
                    self.add_pfg_edge(
                        CsPointer::Var(context.clone(), rhs),
                        CsPointer::StaticField(field),
                    )?;
                }
                StmtKind::Invoke(ref invoke) if invoke.kind == InvokeKind::Static => {
                    let site = Site::new(method, i);
                    if let Some(callee) = callgraph::resolve_callee(program, None, invoke) {
                        let callee_context =
                            self.selector.select_static_context(&context, site, callee);
                        self.process_call_edge(&context, site, invoke, callee_context, callee)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Adds a context-sensitive call-graph edge and, if it is new, wires
    /// up the callee and runs the taint hooks.
    fn process_call_edge(
        &mut self,
        caller_context: &Context,
        site: Site,
        invoke: &Invoke,
        callee_context: Context,
        callee: MethodId,
    ) -> Result<(), Error> {
        let cs_call_site = CsCallSite {
            context: caller_context.clone(),
            site,
        };
        let cs_callee = CsMethod {
            context: callee_context.clone(),
            method: callee,
        };
        let edge = CsCallEdge {
            kind: invoke.kind.into(),
            call_site: cs_call_site,
            callee: cs_callee.clone(),
        };
        if !self.call_graph.add_edge(edge) {
            return Ok(());
        }

        self.add_reachable(cs_callee)?;

        let program = self.program;
        let callee_method = program.method(callee);
        if callee_method.params().len() != invoke.args.len() {
            return Err(Error::IrInconsistency(format!(
                "call at {} passes {} args to {} which takes {}",
                site,
                invoke.args.len(),
                callee_method.subsignature(),
                callee_method.params().len()
            )));
        }
        for (&arg, &param) in invoke.args.iter().zip(callee_method.params()) {
            self.add_pfg_edge(
                CsPointer::Var(caller_context.clone(), arg),
                CsPointer::Var(callee_context.clone(), param),
            )?;
        }
        if let Some(result) = invoke.result {
            for &ret in callee_method.return_vars() {
                self.add_pfg_edge(
                    CsPointer::Var(callee_context.clone(), ret),
                    CsPointer::Var(caller_context.clone(), result),
                )?;
            }
        }

        self.apply_taint_source(caller_context, site, invoke, callee);
        self.apply_taint_transfers(caller_context, site, invoke, callee)?;
        Ok(())
    }

    /// If the callee is a configured source, mint a taint object and
    /// inject it into the call result.
    fn apply_taint_source(
        &mut self,
        caller_context: &Context,
        site: Site,
        invoke: &Invoke,
        callee: MethodId,
    ) {
        let result = match invoke.result {
            Some(result) => result,
            None => return,
        };
        let mut minted = None;
        if let Some(taint) = self.taint.as_mut() {
            if let Some(ty) = taint.config.source_type(callee).cloned() {
                minted = Some(taint.manager.make_taint(&mut self.heap, site, ty));
            }
        }
        if let Some(obj) = minted {
            let cs_obj = self.cs_obj(&Context::empty(), obj);
            let pointer = self.pointer(CsPointer::Var(caller_context.clone(), result));
            self.worklist
                .push_back((pointer, PointsToSet::singleton(cs_obj)));
        }
    }

    /// Applies the configured transfers of `callee` at a call site,
    /// re-typing the taint objects currently visible at the `from`
    /// position into the `to` position.
    fn apply_taint_transfers(
        &mut self,
        caller_context: &Context,
        site: Site,
        invoke: &Invoke,
        callee: MethodId,
    ) -> Result<(), Error> {
        let transfers: Vec<Transfer> = match self.taint.as_ref() {
            Some(taint) => taint.config.transfers_of(callee).to_vec(),
            None => return Ok(()),
        };

        for transfer in transfers {
            let from = match transfer.from {
                TransferPoint::Base => invoke.recv,
                TransferPoint::Result => None,
                TransferPoint::Arg(i) => invoke.args.get(i).copied(),
            };
            let to = match transfer.to {
                TransferPoint::Base => invoke.recv,
                TransferPoint::Result => invoke.result,
                TransferPoint::Arg(i) => invoke.args.get(i).copied(),
            };
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => continue,
            };

            let from_pointer = self.pointer(CsPointer::Var(caller_context.clone(), from));
            let from_pts = self.pointer_info[from_pointer].1.clone();

            let mut tainted = PointsToSet::new();
            for cs_obj in from_pts.iter() {
                let obj = self.cs_obj_info[cs_obj.index()].1;
                let source = match self.heap.obj(obj).taint_source() {
                    Some(source) => source,
                    None => continue,
                };
                let mut minted = None;
                if let Some(taint) = self.taint.as_mut() {
                    minted = Some(taint.manager.make_taint(
                        &mut self.heap,
                        source,
                        transfer.ty.clone(),
                    ));
                }
                if let Some(obj) = minted {
                    let cs_obj = self.cs_obj(&Context::empty(), obj);
                    tainted.add(cs_obj);
                }
            }
            if !tainted.is_empty() {
                let to_pointer = self.pointer(CsPointer::Var(caller_context.clone(), to));
                self.worklist.push_back((to_pointer, tainted));
            }
        }
        Ok(())
    }

    /// Re-applies transfers at every call site where `x` occurs as the
    /// receiver or an argument; its points-to set just grew.
    fn retaint_var(&mut self, context: &Context, x: VarId) -> Result<(), Error> {
        if self.taint.is_none() {
            return Ok(());
        }
        let program = self.program;
        let method = program.var(x).method();

        let mut sites: Vec<Site> = program
            .var(x)
            .invokes()
            .iter()
            .map(|&i| Site::new(method, i))
            .collect();
        if let Some(taint) = self.taint.as_ref() {
            if let Some(extra) = taint.arg_sites.get(&x) {
                sites.extend(extra.iter().copied());
            }
        }

        for site in sites {
            let invoke = match program.invoke_at(site) {
                Some(invoke) => invoke,
                None => continue,
            };
            let cs_call_site = CsCallSite {
                context: context.clone(),
                site,
            };
            let callees: BTreeSet<MethodId> = self
                .call_graph
                .callees_of(&cs_call_site)
                .map(|cm| cm.method)
                .collect();
            for callee in callees {
                self.apply_taint_transfers(context, site, invoke, callee)?;
            }
        }
        Ok(())
    }

    /// Processes work-list entries until the work-list is empty.
    fn analyze(&mut self) -> Result<(), Error> {
        while let Some((pointer, pts)) = self.worklist.pop_front() {
            let delta = self.propagate(pointer, &pts);
            if delta.is_empty() {
                continue;
            }

            let program = self.program;
            if let CsPointer::Var(context, x) = self.pointer_info[pointer].0.clone() {
                let method = program.var(x).method();
                for cs_obj in delta.iter() {
                    for &i in program.var(x).store_fields() {
                        if let StmtKind::StoreField { field, rhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                CsPointer::Var(context.clone(), rhs),
                                CsPointer::InstanceField(cs_obj, field),
                            )?;
                        }
                    }
                    for &i in program.var(x).load_fields() {
                        if let StmtKind::LoadField { lhs, field, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                CsPointer::InstanceField(cs_obj, field),
                                CsPointer::Var(context.clone(), lhs),
                            )?;
                        }
                    }
                    for &i in program.var(x).store_arrays() {
                        if let StmtKind::StoreArray { rhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                CsPointer::Var(context.clone(), rhs),
                                CsPointer::ArrayIndex(cs_obj),
                            )?;
                        }
                    }
                    for &i in program.var(x).load_arrays() {
                        if let StmtKind::LoadArray { lhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                CsPointer::ArrayIndex(cs_obj),
                                CsPointer::Var(context.clone(), lhs),
                            )?;
                        }
                    }
                    self.process_call(&context, x, cs_obj)?;
                }
                self.retaint_var(&context, x)?;
            }
        }
        Ok(())
    }

    /// Propagates `pts` into pt(pointer) and the pointer's PFG successors,
    /// returning the difference set.
    fn propagate(&mut self, pointer: usize, pts: &PointsToSet<CsObjId>) -> PointsToSet<CsObjId> {
        let mut delta = PointsToSet::new();
        for obj in pts.iter() {
            if self.pointer_info[pointer].1.add(obj) {
                delta.add(obj);
            }
        }
        if !delta.is_empty() {
            for succ in self.pfg.successors(pointer) {
                self.worklist.push_back((succ, delta.clone()));
            }
        }
        delta
    }

    /// Processes the instance calls on `x` for a newly discovered receiver
    /// object.
    fn process_call(&mut self, context: &Context, x: VarId, recv: CsObjId) -> Result<(), Error> {
        let program = self.program;
        let method = program.var(x).method();
        let (recv_context, recv_obj) = self.cs_obj_info[recv.index()].clone();

        for &i in program.var(x).invokes() {
            let site = Site::new(method, i);
            let invoke = program
                .invoke_at(site)
                .ok_or_else(|| Error::IrInconsistency(format!("no call site at {}", site)))?;

            let recv_ty = self.heap.obj(recv_obj).ty().clone();
            let callee = match callgraph::resolve_callee(program, Some(&recv_ty), invoke) {
                Some(callee) => callee,
                None => continue,
            };

            let callee_context = self.selector.select_instance_context(
                context,
                site,
                &recv_context,
                recv_obj,
                callee,
            );

            let this = program.method(callee).this().ok_or_else(|| {
                Error::IrInconsistency(format!(
                    "instance method {} has no this variable",
                    program.method(callee).subsignature()
                ))
            })?;
            let this_pointer = self.pointer(CsPointer::Var(callee_context.clone(), this));
            self.worklist
                .push_back((this_pointer, PointsToSet::singleton(recv)));

            self.process_call_edge(context, site, invoke, callee_context, callee)?;
        }
        Ok(())
    }

    /// Sweeps the context-sensitive call graph for configured sinks.
    fn collect_taint_flows(&self) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        let taint = match self.taint.as_ref() {
            Some(taint) => taint,
            None => return flows,
        };

        for edge in self.call_graph.edges() {
            let invoke = match self.program.invoke_at(edge.call_site.site) {
                Some(invoke) => invoke,
                None => continue,
            };
            for index in taint.config.sink_indices(edge.callee.method) {
                let arg = match invoke.args.get(index) {
                    Some(&arg) => arg,
                    None => continue,
                };
                let pointer = CsPointer::Var(edge.call_site.context.clone(), arg);
                let pts = match self.pointers.get(&pointer) {
                    Some(&index) => &self.pointer_info[index].1,
                    None => continue,
                };
                for cs_obj in pts.iter() {
                    let obj = self.cs_obj_info[cs_obj.index()].1;
                    if let Some(source) = self.heap.obj(obj).taint_source() {
                        flows.insert(TaintFlow {
                            source,
                            sink: edge.call_site.site,
                            index,
                        });
                    }
                }
            }
        }
        flows
    }

    /// Collapses contexts into a `PtaResult` and packages the result.
    fn into_result(self, taint_flows: BTreeSet<TaintFlow>) -> CsPtaResult {
        let mut collapsed = PtaResult {
            heap: self.heap,
            ..PtaResult::default()
        };

        for (pointer, pts) in &self.pointer_info {
            let mut objs = PointsToSet::new();
            for cs_obj in pts.iter() {
                objs.add(self.cs_obj_info[cs_obj.index()].1);
            }
            match *pointer {
                CsPointer::Var(_, var) => {
                    let entry = collapsed.var_points_to.entry(var).or_default();
                    for obj in objs.iter() {
                        entry.add(obj);
                    }
                }
                CsPointer::InstanceField(cs_obj, field) => {
                    let obj = self.cs_obj_info[cs_obj.index()].1;
                    let entry = collapsed
                        .instance_field_points_to
                        .entry((obj, field))
                        .or_default();
                    for obj in objs.iter() {
                        entry.add(obj);
                    }
                }
                CsPointer::StaticField(field) => {
                    let entry = collapsed.static_field_points_to.entry(field).or_default();
                    for obj in objs.iter() {
                        entry.add(obj);
                    }
                }
                CsPointer::ArrayIndex(cs_obj) => {
                    let obj = self.cs_obj_info[cs_obj.index()].1;
                    let entry = collapsed.array_points_to.entry(obj).or_default();
                    for obj in objs.iter() {
                        entry.add(obj);
                    }
                }
            }
        }

        let mut call_graph = CallGraph::new();
        let mut seen_entries = FxHashSet::default();
        for entry in &self.call_graph.entries {
            if seen_entries.insert(entry.method) {
                call_graph.add_entry(entry.method);
            }
        }
        for cs_method in &self.call_graph.reachable {
            call_graph.add_reachable(self.program, cs_method.method);
        }
        for edge in &self.call_graph.edges {
            call_graph.add_edge(CallEdge {
                kind: edge.kind,
                call_site: edge.call_site.site,
                callee: edge.callee.method,
            });
        }
        collapsed.call_graph = call_graph;

        CsPtaResult {
            collapsed,
            cs_call_graph: self.call_graph,
            taint_flows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pta::ci;
    use crate::analysis::pta::context::KCallSiteSelector;
    use crate::ir::{MethodRef, ProgramBuilder, Type};

    /// x = id(new A()); y = id(new B()); — one call-site of context keeps
    /// the two allocations apart, while the insensitive analysis merges
    /// them.
    #[test]
    fn one_call_site_contexts_separate_identity_calls() {
        let mut builder = ProgramBuilder::new();
        let a_class = builder.add_class("A", None);
        let util = builder.add_class("Util", None);

        let mut id = builder.method(util, "id(A)", true);
        id.set_return_ty(Type::Reference(a_class));
        let p = id.param("p", Type::Reference(a_class));
        id.stmt(StmtKind::Return { value: Some(p) });
        id.finish();

        let main_class = builder.add_class("Main", None);
        let mut main = builder.method(main_class, "main()", true);
        let o1 = main.var("o1", Type::Reference(a_class));
        let o2 = main.var("o2", Type::Reference(a_class));
        let x = main.var("x", Type::Reference(a_class));
        let y = main.var("y", Type::Reference(a_class));
        let new1 = main.stmt(StmtKind::New {
            lhs: o1,
            ty: Type::Reference(a_class),
        });
        let new2 = main.stmt(StmtKind::New {
            lhs: o2,
            ty: Type::Reference(a_class),
        });
        main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Static,
            method_ref: MethodRef::new(util, "id(A)"),
            recv: None,
            args: vec![o1],
            result: Some(x),
        }));
        main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Static,
            method_ref: MethodRef::new(util, "id(A)"),
            recv: None,
            args: vec![o2],
            result: Some(y),
        }));
        main.stmt(StmtKind::Return { value: None });
        let main = main.finish();
        builder.set_entry(main);
        let program = builder.finish();

        let selector = KCallSiteSelector::new(1);
        let cs_result = solve(&program, &selector).unwrap();
        let ci_result = ci::solve(&program).unwrap();

        // objects intern in statement order
        let o_1 = ObjId(0);
        let o_2 = ObjId(1);
        assert_eq!(
            cs_result.heap().obj(o_1).alloc_site(),
            Some(Site::new(main, new1))
        );
        assert_eq!(
            cs_result.heap().obj(o_2).alloc_site(),
            Some(Site::new(main, new2))
        );

        // context-sensitive: each result sees only its own allocation
        assert_eq!(cs_result.points_to(x).len(), 1);
        assert!(cs_result.points_to(x).contains(o_1));
        assert_eq!(cs_result.points_to(y).len(), 1);
        assert!(cs_result.points_to(y).contains(o_2));

        // context-insensitive: both allocations merge through the shared
        // parameter
        assert_eq!(ci_result.points_to(x).len(), 2);
        assert_eq!(ci_result.points_to(y).len(), 2);
    }

    /// The collapsed call graph of the context-sensitive analysis matches
    /// the shape of the insensitive one.
    #[test]
    fn collapsed_call_graph() {
        let mut builder = ProgramBuilder::new();
        let a_class = builder.add_class("A", None);
        let mut m = builder.method(a_class, "m()", false);
        m.this(Type::Reference(a_class));
        m.stmt(StmtKind::Return { value: None });
        let a_m = m.finish();

        let main_class = builder.add_class("Main", None);
        let mut main = builder.method(main_class, "main()", true);
        let a = main.var("a", Type::Reference(a_class));
        main.stmt(StmtKind::New {
            lhs: a,
            ty: Type::Reference(a_class),
        });
        let call = main.stmt(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Virtual,
            method_ref: MethodRef::new(a_class, "m()"),
            recv: Some(a),
            args: vec![],
            result: None,
        }));
        main.stmt(StmtKind::Return { value: None });
        let main = main.finish();
        builder.set_entry(main);
        let program = builder.finish();

        let selector = KCallSiteSelector::new(2);
        let result = solve(&program, &selector).unwrap();
        let collapsed = result.as_pta();
        let callees: Vec<MethodId> = collapsed
            .call_graph()
            .callees_of(Site::new(main, call))
            .collect();
        assert_eq!(callees, vec![a_m]);
        assert!(collapsed.call_graph().contains(a_m));
        assert!(result.taint_flows().is_empty());
    }
}
