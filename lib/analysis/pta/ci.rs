//! Context-insensitive inclusion-based pointer analysis.

use log::{debug, info};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::analysis::callgraph::{self, CallEdge, CallGraph};
use crate::analysis::pta::{HeapModel, ObjId, Pfg, PointsToSet, PtaResult};
use crate::ir::{Exp, FieldId, Invoke, InvokeKind, MethodId, Program, Site, StmtKind, VarId};
use crate::Error;

/// A node of the pointer-flow graph.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum Pointer {
    Var(VarId),
    InstanceField(ObjId, FieldId),
    StaticField(FieldId),
    ArrayIndex(ObjId),
}

/// Runs the context-insensitive pointer analysis from the program's entry
/// method.
pub fn solve(program: &Program) -> Result<PtaResult, Error> {
    Solver::new(program).solve()
}

struct Solver<'a> {
    program: &'a Program,
    heap: HeapModel,
    pointers: FxHashMap<Pointer, usize>,
    pointer_info: Vec<(Pointer, PointsToSet<ObjId>)>,
    pfg: Pfg,
    call_graph: CallGraph,
    worklist: VecDeque<(usize, PointsToSet<ObjId>)>,
}

impl<'a> Solver<'a> {
    fn new(program: &'a Program) -> Solver<'a> {
        Solver {
            program,
            heap: HeapModel::new(),
            pointers: FxHashMap::default(),
            pointer_info: Vec::new(),
            pfg: Pfg::new(),
            call_graph: CallGraph::new(),
            worklist: VecDeque::new(),
        }
    }

    fn solve(mut self) -> Result<PtaResult, Error> {
        let entry = self.program.entry_method().ok_or(Error::NoEntryMethod)?;
        self.call_graph.add_entry(entry);
        self.add_reachable(entry)?;
        self.analyze()?;

        info!(
            "pointer analysis: {} pointers, {} objects, {} reachable methods",
            self.pointer_info.len(),
            self.heap.num_objs(),
            self.call_graph.reachable_methods().len()
        );

        Ok(self.into_result())
    }

    fn pointer(&mut self, pointer: Pointer) -> usize {
        if let Some(&index) = self.pointers.get(&pointer) {
            return index;
        }
        let index = self.pointer_info.len();
        self.pointers.insert(pointer, index);
        self.pointer_info.push((pointer, PointsToSet::new()));
        index
    }

    /// Adds an edge "source -> target" to the PFG, seeding the target with
    /// the source's current points-to set.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) -> Result<(), Error> {
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

    /// Processes a newly reachable method's statements.
    fn add_reachable(&mut self, method: MethodId) -> Result<(), Error> {
        if !self.call_graph.add_reachable(self.program, method) {
            return Ok(());
        }
        debug!("reachable: {}", self.program.method(method).subsignature());

        let program = self.program;
        for (i, stmt) in program.method(method).stmts().iter().enumerate() {
            match *stmt.kind() {
                StmtKind::New { lhs, ref ty } => {
                    let obj = self.heap.obj_at(Site::new(method, i), ty);
                    let pointer = self.pointer(Pointer::Var(lhs));
                    self.worklist.push_back((pointer, PointsToSet::singleton(obj)));
                }
                StmtKind::Assign {
                    lhs,
                    rhs: Exp::Var(rhs),
                } => {
                    self.add_pfg_edge(Pointer::Var(rhs), Pointer::Var(lhs))?;
                }
                StmtKind::LoadField {
                    lhs,
                    base: None,
                    field,
                } => {
                    self.add_pfg_edge(Pointer::StaticField(field), Pointer::Var(lhs))?;
                }
                StmtKind::StoreField {
                    base: None,
                    field,
                    rhs,
                } => {
                    self.add_pfg_edge(Pointer::Var(rhs), Pointer::StaticField(field))?;
                }
                StmtKind::Invoke(ref invoke) if invoke.kind == InvokeKind::Static => {
                    let site = Site::new(method, i);
                    if let Some(callee) = callgraph::resolve_callee(program, None, invoke) {
                        self.add_call_edge(site, invoke, callee)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Adds a call-graph edge and, if it is new, wires up the callee's
    /// parameters and returns.
    fn add_call_edge(&mut self, site: Site, invoke: &Invoke, callee: MethodId) -> Result<(), Error> {
        let edge = CallEdge {
            kind: invoke.kind.into(),
            call_site: site,
            callee,
        };
        if !self.call_graph.add_edge(edge) {
            return Ok(());
        }

        self.add_reachable(callee)?;

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
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param))?;
        }
        if let Some(result) = invoke.result {
            for &ret in callee_method.return_vars() {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(result))?;
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
            if let Pointer::Var(x) = self.pointer_info[pointer].0 {
                let method = program.var(x).method();
                for obj in delta.iter() {
                    for &i in program.var(x).store_fields() {
                        if let StmtKind::StoreField { field, rhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                Pointer::Var(rhs),
                                Pointer::InstanceField(obj, field),
                            )?;
                        }
                    }
                    for &i in program.var(x).load_fields() {
                        if let StmtKind::LoadField { lhs, field, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(
                                Pointer::InstanceField(obj, field),
                                Pointer::Var(lhs),
                            )?;
                        }
                    }
                    for &i in program.var(x).store_arrays() {
                        if let StmtKind::StoreArray { rhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(Pointer::Var(rhs), Pointer::ArrayIndex(obj))?;
                        }
                    }
                    for &i in program.var(x).load_arrays() {
                        if let StmtKind::LoadArray { lhs, .. } =
                            *program.method(method).stmt(i).kind()
                        {
                            self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(lhs))?;
                        }
                    }
                    self.process_call(x, obj)?;
                }
            }
        }
        Ok(())
    }

    /// Propagates `pts` into pt(pointer) and the pointer's PFG successors,
    /// returning the difference set.
    fn propagate(&mut self, pointer: usize, pts: &PointsToSet<ObjId>) -> PointsToSet<ObjId> {
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
    fn process_call(&mut self, x: VarId, recv: ObjId) -> Result<(), Error> {
        let program = self.program;
        let method = program.var(x).method();
        for &i in program.var(x).invokes() {
            let site = Site::new(method, i);
            let invoke = program
                .invoke_at(site)
                .ok_or_else(|| Error::IrInconsistency(format!("no call site at {}", site)))?;

            let recv_ty = self.heap.obj(recv).ty().clone();
            let callee = match callgraph::resolve_callee(program, Some(&recv_ty), invoke) {
                Some(callee) => callee,
                None => continue,
            };

            let this = program.method(callee).this().ok_or_else(|| {
                Error::IrInconsistency(format!(
                    "instance method {} has no this variable",
                    program.method(callee).subsignature()
                ))
            })?;
            let this_pointer = self.pointer(Pointer::Var(this));
            self.worklist
                .push_back((this_pointer, PointsToSet::singleton(recv)));

            self.add_call_edge(site, invoke, callee)?;
        }
        Ok(())
    }

    fn into_result(self) -> PtaResult {
        let mut result = PtaResult {
            heap: self.heap,
            call_graph: self.call_graph,
            ..PtaResult::default()
        };
        for (pointer, pts) in self.pointer_info {
            match pointer {
                Pointer::Var(var) => {
                    result.var_points_to.insert(var, pts);
                }
                Pointer::InstanceField(obj, field) => {
                    result.instance_field_points_to.insert((obj, field), pts);
                }
                Pointer::StaticField(field) => {
                    result.static_field_points_to.insert(field, pts);
                }
                Pointer::ArrayIndex(obj) => {
                    result.array_points_to.insert(obj, pts);
                }
            }
        }
        result
    }
}
