//! The program model: classes, fields, methods, and variables, all owned
//! by a `Program` and referenced by index.

use std::collections::BTreeMap;

use crate::ir::{Cfg, ClassId, FieldId, Invoke, MethodId, Site, Stmt, Type, VarId};

/// A class or interface in the hierarchy.
#[derive(Clone, Debug)]
pub struct Class {
    name: String,
    super_class: Option<ClassId>,
    interfaces: Vec<ClassId>,
    is_interface: bool,
    // Direct hierarchy links, maintained by the builder.
    subclasses: Vec<ClassId>,
    subinterfaces: Vec<ClassId>,
    implementors: Vec<ClassId>,
    // Declared methods by subsignature.
    methods: BTreeMap<String, MethodId>,
}

impl Class {
    pub(crate) fn new(name: String, super_class: Option<ClassId>, is_interface: bool) -> Class {
        Class {
            name,
            super_class,
            interfaces: Vec::new(),
            is_interface,
            subclasses: Vec::new(),
            subinterfaces: Vec::new(),
            implementors: Vec::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_class(&self) -> Option<ClassId> {
        self.super_class
    }

    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// The method this class itself declares under the given subsignature.
    pub fn declared_method(&self, subsignature: &str) -> Option<MethodId> {
        self.methods.get(subsignature).copied()
    }

    pub(crate) fn add_interface(&mut self, interface: ClassId) {
        self.interfaces.push(interface);
    }

    pub(crate) fn add_subclass(&mut self, class: ClassId) {
        self.subclasses.push(class);
    }

    pub(crate) fn add_subinterface(&mut self, interface: ClassId) {
        self.subinterfaces.push(interface);
    }

    pub(crate) fn add_implementor(&mut self, class: ClassId) {
        self.implementors.push(class);
    }

    pub(crate) fn declare_method(&mut self, subsignature: String, method: MethodId) {
        self.methods.insert(subsignature, method);
    }
}

/// A field declared by a class.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    class: ClassId,
    ty: Type,
    is_static: bool,
}

impl Field {
    pub(crate) fn new(name: String, class: ClassId, ty: Type, is_static: bool) -> Field {
        Field {
            name,
            class,
            ty,
            is_static,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A variable in a method body.
///
/// Alongside its name and type, a variable carries indexes of the
/// statements that are relevant to it during pointer analysis: the field
/// and array accesses it is the base of, and the call sites it receives.
#[derive(Clone, Debug)]
pub struct Var {
    name: String,
    ty: Type,
    method: MethodId,
    load_fields: Vec<usize>,
    store_fields: Vec<usize>,
    load_arrays: Vec<usize>,
    store_arrays: Vec<usize>,
    invokes: Vec<usize>,
}

impl Var {
    pub(crate) fn new(name: String, ty: Type, method: MethodId) -> Var {
        Var {
            name,
            ty,
            method,
            load_fields: Vec::new(),
            store_fields: Vec::new(),
            load_arrays: Vec::new(),
            store_arrays: Vec::new(),
            invokes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Statement indices of `x = base.f` loads with this variable as base.
    pub fn load_fields(&self) -> &[usize] {
        &self.load_fields
    }

    /// Statement indices of `base.f = x` stores with this variable as base.
    pub fn store_fields(&self) -> &[usize] {
        &self.store_fields
    }

    /// Statement indices of `x = base[i]` loads with this variable as base.
    pub fn load_arrays(&self) -> &[usize] {
        &self.load_arrays
    }

    /// Statement indices of `base[i] = x` stores with this variable as base.
    pub fn store_arrays(&self) -> &[usize] {
        &self.store_arrays
    }

    /// Statement indices of call sites with this variable as receiver.
    pub fn invokes(&self) -> &[usize] {
        &self.invokes
    }

    pub(crate) fn record_load_field(&mut self, stmt: usize) {
        self.load_fields.push(stmt);
    }

    pub(crate) fn record_store_field(&mut self, stmt: usize) {
        self.store_fields.push(stmt);
    }

    pub(crate) fn record_load_array(&mut self, stmt: usize) {
        self.load_arrays.push(stmt);
    }

    pub(crate) fn record_store_array(&mut self, stmt: usize) {
        self.store_arrays.push(stmt);
    }

    pub(crate) fn record_invoke(&mut self, stmt: usize) {
        self.invokes.push(stmt);
    }
}

/// A method: signature, body, and control-flow graph.
#[derive(Clone, Debug)]
pub struct Method {
    subsignature: String,
    class: ClassId,
    is_static: bool,
    is_abstract: bool,
    this: Option<VarId>,
    params: Vec<VarId>,
    return_vars: Vec<VarId>,
    return_ty: Type,
    stmts: Vec<Stmt>,
    cfg: Cfg,
}

impl Method {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        subsignature: String,
        class: ClassId,
        is_static: bool,
        is_abstract: bool,
        this: Option<VarId>,
        params: Vec<VarId>,
        return_vars: Vec<VarId>,
        return_ty: Type,
        stmts: Vec<Stmt>,
        cfg: Cfg,
    ) -> Method {
        Method {
            subsignature,
            class,
            is_static,
            is_abstract,
            this,
            params,
            return_vars,
            return_ty,
            stmts,
            cfg,
        }
    }

    pub fn subsignature(&self) -> &str {
        &self.subsignature
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The `this` variable; `None` for static and abstract methods.
    pub fn this(&self) -> Option<VarId> {
        self.this
    }

    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    /// The variables returned by this method's `Return` statements.
    pub fn return_vars(&self) -> &[VarId] {
        &self.return_vars
    }

    pub fn return_ty(&self) -> &Type {
        &self.return_ty
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn stmt(&self, index: usize) -> &Stmt {
        &self.stmts[index]
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Every call site in this method, as (statement index, invoke) pairs.
    pub fn call_sites(&self) -> impl Iterator<Item = (usize, &Invoke)> {
        self.stmts
            .iter()
            .enumerate()
            .filter_map(|(i, stmt)| stmt.invoke().map(|invoke| (i, invoke)))
    }
}

/// A whole program: the arenas and the class hierarchy.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub(crate) classes: Vec<Class>,
    pub(crate) fields: Vec<Field>,
    pub(crate) methods: Vec<Method>,
    pub(crate) vars: Vec<Var>,
    pub(crate) entry: Option<MethodId>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The program's entry method, if one was declared.
    pub fn entry_method(&self) -> Option<MethodId> {
        self.entry
    }

    /// Looks up a class by name.
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name() == name)
            .map(ClassId)
    }

    /// The statement at a program point.
    pub fn stmt_at(&self, site: Site) -> &Stmt {
        self.method(site.method).stmt(site.stmt)
    }

    /// The call site at a program point, if the statement is one.
    pub fn invoke_at(&self, site: Site) -> Option<&Invoke> {
        self.stmt_at(site).invoke()
    }

    // Hierarchy queries.

    pub fn super_class_of(&self, class: ClassId) -> Option<ClassId> {
        self.class(class).super_class()
    }

    pub fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        &self.class(class).subclasses
    }

    pub fn direct_subinterfaces_of(&self, interface: ClassId) -> &[ClassId] {
        &self.class(interface).subinterfaces
    }

    pub fn direct_implementors_of(&self, interface: ClassId) -> &[ClassId] {
        &self.class(interface).implementors
    }

    /// The method `class` itself declares under `subsignature`.
    pub fn declared_method(&self, class: ClassId, subsignature: &str) -> Option<MethodId> {
        self.class(class).declared_method(subsignature)
    }
}
