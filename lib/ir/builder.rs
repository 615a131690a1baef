//! Builders for assembling programs.
//!
//! A [`ProgramBuilder`] owns the arenas while classes, fields, and methods
//! are added; [`ProgramBuilder::finish`] freezes them into an immutable
//! [`Program`]. Method bodies are built statement by statement through a
//! [`MethodBuilder`], which derives the control-flow graph: fall-through
//! edges are added automatically, branch statements take explicit edges,
//! and `Return` statements are wired to the synthetic exit.

use rustc_hash::FxHashSet;

use crate::ir::{
    Cfg, CfgEdgeKind, Class, ClassId, Field, FieldId, Method, MethodId, Program, Stmt, StmtKind,
    Type, Var, VarId,
};

/// Builds a `Program`.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Adds a class with an optional superclass.
    pub fn add_class<S: Into<String>>(&mut self, name: S, super_class: Option<ClassId>) -> ClassId {
        let id = ClassId(self.program.classes.len());
        self.program
            .classes
            .push(Class::new(name.into(), super_class, false));
        if let Some(super_class) = super_class {
            self.program.classes[super_class.index()].add_subclass(id);
        }
        id
    }

    /// Adds an interface.
    pub fn add_interface<S: Into<String>>(&mut self, name: S) -> ClassId {
        let id = ClassId(self.program.classes.len());
        self.program.classes.push(Class::new(name.into(), None, true));
        id
    }

    /// Declares `sub` a direct subinterface of `sup`.
    pub fn extend_interface(&mut self, sub: ClassId, sup: ClassId) {
        self.program.classes[sub.index()].add_interface(sup);
        self.program.classes[sup.index()].add_subinterface(sub);
    }

    /// Declares that `class` directly implements `interface`.
    pub fn implement(&mut self, class: ClassId, interface: ClassId) {
        self.program.classes[class.index()].add_interface(interface);
        self.program.classes[interface.index()].add_implementor(class);
    }

    pub fn add_field<S: Into<String>>(
        &mut self,
        class: ClassId,
        name: S,
        ty: Type,
        is_static: bool,
    ) -> FieldId {
        let id = FieldId(self.program.fields.len());
        self.program
            .fields
            .push(Field::new(name.into(), class, ty, is_static));
        id
    }

    /// Declares an abstract method: it participates in dispatch but has no
    /// body.
    pub fn add_abstract_method<S: Into<String>>(&mut self, class: ClassId, subsignature: S) -> MethodId {
        let id = MethodId(self.program.methods.len());
        let subsignature = subsignature.into();
        self.program.classes[class.index()].declare_method(subsignature.clone(), id);
        self.program.methods.push(Method::new(
            subsignature,
            class,
            false,
            true,
            None,
            Vec::new(),
            Vec::new(),
            Type::Void,
            Vec::new(),
            Cfg::new(id, 0),
        ));
        id
    }

    /// Starts a concrete method on `class`. The subsignature identifies the
    /// method for dispatch (e.g. `"foo(int)"`).
    pub fn method<S: Into<String>>(
        &mut self,
        class: ClassId,
        subsignature: S,
        is_static: bool,
    ) -> MethodBuilder {
        let id = MethodId(self.program.methods.len());
        MethodBuilder {
            builder: self,
            id,
            class,
            subsignature: subsignature.into(),
            is_static,
            return_ty: Type::Void,
            this: None,
            params: Vec::new(),
            stmts: Vec::new(),
            edges: Vec::new(),
            explicit_out: FxHashSet::default(),
        }
    }

    /// Marks the program's entry method.
    pub fn set_entry(&mut self, method: MethodId) {
        self.program.entry = Some(method);
    }

    /// Freezes the arenas into an immutable `Program`.
    pub fn finish(self) -> Program {
        self.program
    }
}

/// Builds one method body. Obtained from [`ProgramBuilder::method`];
/// [`MethodBuilder::finish`] registers the method with its class and
/// returns its id.
#[derive(Debug)]
pub struct MethodBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    id: MethodId,
    class: ClassId,
    subsignature: String,
    is_static: bool,
    return_ty: Type,
    this: Option<VarId>,
    params: Vec<VarId>,
    stmts: Vec<Stmt>,
    edges: Vec<(usize, usize, CfgEdgeKind)>,
    explicit_out: FxHashSet<usize>,
}

impl<'a> MethodBuilder<'a> {
    pub fn set_return_ty(&mut self, ty: Type) {
        self.return_ty = ty;
    }

    fn add_var(&mut self, name: String, ty: Type) -> VarId {
        let id = VarId(self.builder.program.vars.len());
        self.builder.program.vars.push(Var::new(name, ty, self.id));
        id
    }

    /// Declares the receiver variable.
    pub fn this(&mut self, ty: Type) -> VarId {
        let var = self.add_var("this".to_string(), ty);
        self.this = Some(var);
        var
    }

    /// Declares the next formal parameter.
    pub fn param<S: Into<String>>(&mut self, name: S, ty: Type) -> VarId {
        let var = self.add_var(name.into(), ty);
        self.params.push(var);
        var
    }

    /// Declares a local variable.
    pub fn var<S: Into<String>>(&mut self, name: S, ty: Type) -> VarId {
        self.add_var(name.into(), ty)
    }

    /// Appends a statement and returns its index.
    pub fn stmt(&mut self, kind: StmtKind) -> usize {
        let index = self.stmts.len();
        self.stmts.push(Stmt::new(index, kind));
        index
    }

    /// Adds an explicit control-flow edge between two statement indices.
    /// Statements with an explicit outgoing edge get no automatic
    /// fall-through edge.
    pub fn edge(&mut self, from: usize, to: usize, kind: CfgEdgeKind) {
        self.explicit_out.insert(from);
        self.edges.push((from, to, kind));
    }

    /// Finalizes the body: derives the control-flow graph, collects return
    /// variables, indexes per-variable sites, and registers the method.
    pub fn finish(self) -> MethodId {
        let MethodBuilder {
            builder,
            id,
            class,
            subsignature,
            is_static,
            return_ty,
            this,
            params,
            stmts,
            edges,
            explicit_out,
        } = self;

        let mut cfg = Cfg::new(id, stmts.len());
        let entry = cfg.entry();
        let exit = cfg.exit();

        if stmts.is_empty() {
            cfg.add_edge(entry, exit, CfgEdgeKind::Normal);
        } else {
            cfg.add_edge(entry, 0, CfgEdgeKind::Normal);
        }

        let mut return_vars = Vec::new();
        for (i, stmt) in stmts.iter().enumerate() {
            match *stmt.kind() {
                StmtKind::Return { value } => {
                    cfg.add_edge(i, exit, CfgEdgeKind::Normal);
                    if let Some(var) = value {
                        if !return_vars.contains(&var) {
                            return_vars.push(var);
                        }
                    }
                }
                StmtKind::Goto | StmtKind::If { .. } | StmtKind::Switch { .. } => {}
                _ => {
                    if !explicit_out.contains(&i) {
                        if i + 1 < stmts.len() {
                            cfg.add_edge(i, i + 1, CfgEdgeKind::Normal);
                        } else {
                            cfg.add_edge(i, exit, CfgEdgeKind::Normal);
                        }
                    }
                }
            }
        }
        for (from, to, kind) in edges {
            cfg.add_edge(from, to, kind);
        }

        for (i, stmt) in stmts.iter().enumerate() {
            let vars = &mut builder.program.vars;
            match *stmt.kind() {
                StmtKind::LoadField {
                    base: Some(base), ..
                } => vars[base.index()].record_load_field(i),
                StmtKind::StoreField {
                    base: Some(base), ..
                } => vars[base.index()].record_store_field(i),
                StmtKind::LoadArray { base, .. } => vars[base.index()].record_load_array(i),
                StmtKind::StoreArray { base, .. } => vars[base.index()].record_store_array(i),
                StmtKind::Invoke(ref invoke) => {
                    if let Some(recv) = invoke.recv {
                        vars[recv.index()].record_invoke(i);
                    }
                }
                _ => {}
            }
        }

        builder.program.classes[class.index()].declare_method(subsignature.clone(), id);
        builder.program.methods.push(Method::new(
            subsignature,
            class,
            is_static,
            false,
            this,
            params,
            return_vars,
            return_ty,
            stmts,
            cfg,
        ));

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Exp;

    #[test]
    fn fallthrough_and_return_edges() {
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "main()", true);
        let x = m.var("x", Type::int());
        m.stmt(StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(1),
        });
        m.stmt(StmtKind::Return { value: Some(x) });
        let m = m.finish();
        let program = builder.finish();

        let method = program.method(m);
        let cfg = method.cfg();
        assert_eq!(cfg.successors(cfg.entry()), vec![0]);
        assert_eq!(cfg.successors(0), vec![1]);
        assert_eq!(cfg.successors(1), vec![cfg.exit()]);
        assert_eq!(method.return_vars(), [x]);
    }

    #[test]
    fn hierarchy_links() {
        let mut builder = ProgramBuilder::new();
        let object = builder.add_class("Object", None);
        let a = builder.add_class("A", Some(object));
        let b = builder.add_class("B", Some(a));
        let i = builder.add_interface("I");
        builder.implement(a, i);
        let program = builder.finish();

        assert_eq!(program.direct_subclasses_of(object), [a]);
        assert_eq!(program.direct_subclasses_of(a), [b]);
        assert_eq!(program.direct_implementors_of(i), [a]);
        assert_eq!(program.super_class_of(b), Some(a));
    }
}
