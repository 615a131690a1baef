//! Inter-procedural constant propagation on the ICFG.
//!
//! The solver runs the constant-propagation transfer over the whole ICFG
//! with edge transfers: call edges bind actuals to formals, return edges
//! bind the callee's returns to the call result, and call-to-return edges
//! carry the caller's fact across the call minus the defined variable.
//!
//! Heap flow is resolved through a [`HeapFactStore`] fed by a pointer
//! analysis: stores meet their value into per-(object, field) and
//! per-(object, index) tables and re-enqueue the loads of every alias;
//! loads read those tables back.

use log::info;
use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, VecDeque};

use crate::analysis::constprop::{self, meet_value, CPFact, ConstantPropagation, Value};
use crate::analysis::dataflow::DataflowAnalysis;
use crate::analysis::pta::{ObjId, PtaResult};
use crate::ir::{Exp, FieldId, Icfg, IcfgEdge, IcfgEdgeKind, Program, Site, Stmt, StmtKind, VarId};
use crate::Error;

const DEFAULT_MAX_ANALYSIS_STEPS: usize = 1_000_000;

/// Per-node IN/OUT facts, indexed by ICFG node id.
#[derive(Clone, Debug)]
pub struct InterDataflowResult {
    in_facts: Vec<CPFact>,
    out_facts: Vec<CPFact>,
}

impl InterDataflowResult {
    pub fn in_fact(&self, node: usize) -> &CPFact {
        &self.in_facts[node]
    }

    pub fn out_fact(&self, node: usize) -> &CPFact {
        &self.out_facts[node]
    }
}

/// The heap-indexed value tables bridging constant propagation and the
/// pointer analysis, owned by the solver.
#[derive(Debug, Default)]
struct HeapFactStore {
    /// obj -> variables that may point to it.
    alias: FxHashMap<ObjId, BTreeSet<VarId>>,
    /// (obj, field) -> met value of all stores.
    instance: FxHashMap<(ObjId, FieldId), Value>,
    /// static field -> met value of all stores.
    statics: FxHashMap<FieldId, Value>,
    /// (obj, index value) -> met value of all stores at that index.
    arrays: FxHashMap<(ObjId, Value), Value>,
    /// static field -> ICFG nodes loading it.
    static_loads: FxHashMap<FieldId, BTreeSet<usize>>,
}

/// Inter-procedural constant propagation over an ICFG, consuming a
/// pointer-analysis result for heap flow.
pub struct InterConstantPropagation<'a> {
    program: &'a Program,
    icfg: &'a Icfg,
    pta: &'a PtaResult,
}

impl<'a> InterConstantPropagation<'a> {
    pub fn new(
        program: &'a Program,
        icfg: &'a Icfg,
        pta: &'a PtaResult,
    ) -> InterConstantPropagation<'a> {
        InterConstantPropagation { program, icfg, pta }
    }

    pub fn solve(&self) -> Result<InterDataflowResult, Error> {
        let program = self.program;
        let icfg = self.icfg;
        let cp = ConstantPropagation::new(program);
        let node_count = icfg.node_count();

        let mut in_facts = vec![CPFact::new(); node_count];
        let mut out_facts = vec![CPFact::new(); node_count];

        let mut store = HeapFactStore::default();
        for var in self.pta.vars() {
            for obj in self.pta.points_to(var).iter() {
                store.alias.entry(obj).or_default().insert(var);
            }
        }
        for (id, icfg_node) in icfg.nodes().iter().enumerate() {
            let method = program.method(icfg_node.method);
            if let Some(i) = method.cfg().node_stmt(icfg_node.node) {
                if let StmtKind::LoadField {
                    base: None, field, ..
                } = *method.stmt(i).kind()
                {
                    store.static_loads.entry(field).or_default().insert(id);
                }
            }
        }

        for &entry in icfg.entry_nodes() {
            let method = program.method(icfg.node(entry).method);
            let boundary = cp.boundary_fact(method);
            in_facts[entry] = boundary.clone();
            out_facts[entry] = boundary;
        }

        let mut queue: VecDeque<usize> = (0..node_count).collect();
        let mut queued = vec![true; node_count];

        let mut steps = 0;
        while let Some(node) = queue.pop_front() {
            if steps > DEFAULT_MAX_ANALYSIS_STEPS {
                return Err(Error::Analysis(
                    "inter-procedural constant propagation exceeded max steps".to_string(),
                ));
            }
            steps += 1;
            queued[node] = false;

            for edge in icfg.in_edges_of(node) {
                let fact = self.transfer_edge(edge, &out_facts[edge.source])?;
                constprop::meet_into(&fact, &mut in_facts[node]);
            }

            let icfg_node = icfg.node(node);
            let method = program.method(icfg_node.method);
            let stmt = method.cfg().node_stmt(icfg_node.node).map(|i| method.stmt(i));

            if let Some(stmt) = stmt {
                match *stmt.kind() {
                    StmtKind::StoreField { .. } => self.handle_store_field(
                        stmt,
                        &in_facts[node],
                        &mut store,
                        &mut queue,
                        &mut queued,
                    ),
                    StmtKind::StoreArray { .. } => self.handle_store_array(
                        stmt,
                        &in_facts[node],
                        &mut store,
                        &mut queue,
                        &mut queued,
                    ),
                    _ => {}
                }
            }

            if self.transfer_node(stmt, &in_facts[node], &mut out_facts[node], &store) {
                for edge in icfg.out_edges_of(node) {
                    if !queued[edge.target] {
                        queued[edge.target] = true;
                        queue.push_back(edge.target);
                    }
                }
            }
        }

        info!(
            "inter-procedural constant propagation converged in {} steps over {} nodes",
            steps, node_count
        );

        Ok(InterDataflowResult {
            in_facts,
            out_facts,
        })
    }

    fn transfer_edge(&self, edge: &IcfgEdge, out: &CPFact) -> Result<CPFact, Error> {
        let program = self.program;
        match edge.kind {
            IcfgEdgeKind::Normal => Ok(out.clone()),
            IcfgEdgeKind::CallToReturn { call_site } => {
                let mut fact = out.clone();
                if let Some(def) = program.stmt_at(call_site).def() {
                    fact.remove(def);
                }
                Ok(fact)
            }
            IcfgEdgeKind::Call { call_site, callee } => {
                let invoke = program.invoke_at(call_site).ok_or_else(|| {
                    Error::IrInconsistency(format!("no call site at {}", call_site))
                })?;
                let callee_method = program.method(callee);
                if callee_method.params().len() != invoke.args.len() {
                    return Err(Error::IrInconsistency(format!(
                        "call at {} passes {} args to {} which takes {}",
                        call_site,
                        invoke.args.len(),
                        callee_method.subsignature(),
                        callee_method.params().len()
                    )));
                }
                let mut fact = CPFact::new();
                for (&arg, &param) in invoke.args.iter().zip(callee_method.params()) {
                    if program.var(param).ty().can_hold_int() {
                        fact.update(param, out.get(arg));
                    }
                }
                Ok(fact)
            }
            IcfgEdgeKind::Return {
                call_site,
                ref return_vars,
                ..
            } => {
                let mut fact = CPFact::new();
                if let Some(def) = program.stmt_at(call_site).def() {
                    if program.var(def).ty().can_hold_int() {
                        let mut value = Value::Undef;
                        for &ret in return_vars {
                            value = meet_value(value, out.get(ret));
                        }
                        fact.update(def, value);
                    }
                }
                Ok(fact)
            }
        }
    }

    // Call nodes carry their IN across unchanged; the call-to-return edge
    // strips the defined variable and the return edge supplies it.
    fn transfer_node(
        &self,
        stmt: Option<&Stmt>,
        in_fact: &CPFact,
        out: &mut CPFact,
        store: &HeapFactStore,
    ) -> bool {
        let mut updated = in_fact.clone();
        if let Some(stmt) = stmt {
            if !stmt.is_call() {
                if let Some(def) = stmt.def() {
                    if self.program.var(def).ty().can_hold_int() {
                        let value = match *stmt.kind() {
                            StmtKind::Assign { ref rhs, .. } => constprop::evaluate(rhs, in_fact),
                            StmtKind::LoadField {
                                base: Some(base),
                                field,
                                ..
                            } => self.evaluate_instance_load(base, field, store),
                            StmtKind::LoadField {
                                base: None, field, ..
                            } => store.statics.get(&field).copied().unwrap_or(Value::Undef),
                            StmtKind::LoadArray { base, index, .. } => {
                                self.evaluate_array_load(base, index, in_fact, store)
                            }
                            _ => Value::Nac,
                        };
                        updated.update(def, value);
                    }
                }
            }
        }
        let changed = *out != updated;
        *out = updated;
        changed
    }

    fn evaluate_instance_load(&self, base: VarId, field: FieldId, store: &HeapFactStore) -> Value {
        let mut value = Value::Undef;
        for obj in self.pta.points_to(base).iter() {
            let stored = store
                .instance
                .get(&(obj, field))
                .copied()
                .unwrap_or(Value::Undef);
            value = meet_value(value, stored);
        }
        value
    }

    fn evaluate_array_load(
        &self,
        base: VarId,
        index: VarId,
        in_fact: &CPFact,
        store: &HeapFactStore,
    ) -> Value {
        let index_value = constprop::evaluate(&Exp::Var(index), in_fact);
        let mut value = Value::Undef;
        match index_value {
            Value::Undef => {}
            Value::Const(_) => {
                for obj in self.pta.points_to(base).iter() {
                    for key in [(obj, index_value), (obj, Value::Nac)] {
                        let stored = store.arrays.get(&key).copied().unwrap_or(Value::Undef);
                        value = meet_value(value, stored);
                    }
                }
            }
            Value::Nac => {
                for obj in self.pta.points_to(base).iter() {
                    for (&(o, _), &stored) in &store.arrays {
                        if o == obj {
                            value = meet_value(value, stored);
                        }
                    }
                }
            }
        }
        value
    }

    fn handle_store_field(
        &self,
        stmt: &Stmt,
        in_fact: &CPFact,
        store: &mut HeapFactStore,
        queue: &mut VecDeque<usize>,
        queued: &mut [bool],
    ) {
        let (base, field, rhs) = match *stmt.kind() {
            StmtKind::StoreField { base, field, rhs } => (base, field, rhs),
            _ => return,
        };
        if !self.program.var(rhs).ty().can_hold_int() {
            return;
        }
        let new_value = constprop::evaluate(&Exp::Var(rhs), in_fact);

        match base {
            Some(base) => {
                for obj in self.pta.points_to(base).iter() {
                    let key = (obj, field);
                    let old = store.instance.get(&key).copied().unwrap_or(Value::Undef);
                    let merged = meet_value(old, new_value);
                    if merged != old {
                        store.instance.insert(key, merged);
                        self.enqueue_field_loads(obj, field, &*store, queue, queued);
                    }
                }
            }
            None => {
                let old = store.statics.get(&field).copied().unwrap_or(Value::Undef);
                let merged = meet_value(old, new_value);
                if merged != old {
                    store.statics.insert(field, merged);
                    if let Some(loads) = store.static_loads.get(&field) {
                        for &node in loads {
                            enqueue(queue, queued, node);
                        }
                    }
                }
            }
        }
    }

    fn handle_store_array(
        &self,
        stmt: &Stmt,
        in_fact: &CPFact,
        store: &mut HeapFactStore,
        queue: &mut VecDeque<usize>,
        queued: &mut [bool],
    ) {
        let (base, index, rhs) = match *stmt.kind() {
            StmtKind::StoreArray { base, index, rhs } => (base, index, rhs),
            _ => return,
        };
        if !self.program.var(rhs).ty().can_hold_int() {
            return;
        }
        let index_value = constprop::evaluate(&Exp::Var(index), in_fact);
        if index_value.is_undef() {
            return;
        }
        let new_value = constprop::evaluate(&Exp::Var(rhs), in_fact);

        for obj in self.pta.points_to(base).iter() {
            let key = (obj, index_value);
            let old = store.arrays.get(&key).copied().unwrap_or(Value::Undef);
            let merged = meet_value(old, new_value);
            if merged != old {
                store.arrays.insert(key, merged);
                self.enqueue_array_loads(obj, &*store, queue, queued);
            }
        }
    }

    /// Re-enqueues every load of `field` through a variable aliased to
    /// `obj`.
    fn enqueue_field_loads(
        &self,
        obj: ObjId,
        field: FieldId,
        store: &HeapFactStore,
        queue: &mut VecDeque<usize>,
        queued: &mut [bool],
    ) {
        let aliases = match store.alias.get(&obj) {
            Some(aliases) => aliases,
            None => return,
        };
        for &var in aliases {
            let v = self.program.var(var);
            for &i in v.load_fields() {
                if let StmtKind::LoadField { field: f, .. } =
                    *self.program.method(v.method()).stmt(i).kind()
                {
                    if f == field {
                        if let Some(node) = self.icfg.stmt_node(Site::new(v.method(), i)) {
                            enqueue(queue, queued, node);
                        }
                    }
                }
            }
        }
    }

    /// Re-enqueues every array load through a variable aliased to `obj`.
    fn enqueue_array_loads(
        &self,
        obj: ObjId,
        store: &HeapFactStore,
        queue: &mut VecDeque<usize>,
        queued: &mut [bool],
    ) {
        let aliases = match store.alias.get(&obj) {
            Some(aliases) => aliases,
            None => return,
        };
        for &var in aliases {
            let v = self.program.var(var);
            for &i in v.load_arrays() {
                if let Some(node) = self.icfg.stmt_node(Site::new(v.method(), i)) {
                    enqueue(queue, queued, node);
                }
            }
        }
    }
}

fn enqueue(queue: &mut VecDeque<usize>, queued: &mut [bool], node: usize) {
    if !queued[node] {
        queued[node] = true;
        queue.push_back(node);
    }
}
