//! A `Stmt` is a single three-address statement in a method body.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ir::{ClassId, Exp, FieldId, Type, VarId};

/// How a call site dispatches.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// An unresolved reference to a method: the class named at the call site
/// and the callee's subsignature.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: String,
}

impl MethodRef {
    pub fn new<S: Into<String>>(class: ClassId, subsignature: S) -> MethodRef {
        MethodRef {
            class,
            subsignature: subsignature.into(),
        }
    }
}

/// A call site.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Invoke {
    pub kind: InvokeKind,
    pub method_ref: MethodRef,
    /// The receiver variable; `None` for static calls.
    pub recv: Option<VarId>,
    pub args: Vec<VarId>,
    /// The variable receiving the call's result, if any.
    pub result: Option<VarId>,
}

/// A statement updates some state.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum StmtKind {
    Nop,
    /// Assign the value of an expression to a variable. Covers copies,
    /// literal loads, and binary computations.
    Assign { lhs: VarId, rhs: Exp },
    /// Allocate a fresh object; this statement is the allocation site.
    New { lhs: VarId, ty: Type },
    Cast { lhs: VarId, ty: Type, rhs: VarId },
    /// Read a field. `base` is `None` for static fields.
    LoadField {
        lhs: VarId,
        base: Option<VarId>,
        field: FieldId,
    },
    /// Write a field. `base` is `None` for static fields.
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        rhs: VarId,
    },
    LoadArray { lhs: VarId, base: VarId, index: VarId },
    StoreArray { base: VarId, index: VarId, rhs: VarId },
    Invoke(Invoke),
    /// Conditional branch; successors carry `IfTrue`/`IfFalse` edges.
    If { cond: Exp },
    Goto,
    /// Multi-way branch; successors carry `SwitchCase`/`SwitchDefault`
    /// edges.
    Switch { var: VarId, cases: Vec<i32> },
    Return { value: Option<VarId> },
}

/// A statement and its index within its method.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Stmt {
    index: usize,
    kind: StmtKind,
}

impl Stmt {
    pub fn new(index: usize, kind: StmtKind) -> Stmt {
        Stmt { index, kind }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }

    /// The variable this statement defines, if any.
    pub fn def(&self) -> Option<VarId> {
        match self.kind {
            StmtKind::Assign { lhs, .. }
            | StmtKind::New { lhs, .. }
            | StmtKind::Cast { lhs, .. }
            | StmtKind::LoadField { lhs, .. }
            | StmtKind::LoadArray { lhs, .. } => Some(lhs),
            StmtKind::Invoke(ref invoke) => invoke.result,
            StmtKind::Nop
            | StmtKind::StoreField { .. }
            | StmtKind::StoreArray { .. }
            | StmtKind::If { .. }
            | StmtKind::Goto
            | StmtKind::Switch { .. }
            | StmtKind::Return { .. } => None,
        }
    }

    /// Every variable this statement reads.
    pub fn uses(&self) -> Vec<VarId> {
        match self.kind {
            StmtKind::Nop | StmtKind::New { .. } | StmtKind::Goto => vec![],
            StmtKind::Assign { ref rhs, .. } => rhs.uses(),
            StmtKind::Cast { rhs, .. } => vec![rhs],
            StmtKind::LoadField { base, .. } => base.into_iter().collect(),
            StmtKind::StoreField { base, rhs, .. } => {
                base.into_iter().chain(std::iter::once(rhs)).collect()
            }
            StmtKind::LoadArray { base, index, .. } => vec![base, index],
            StmtKind::StoreArray { base, index, rhs } => vec![base, index, rhs],
            StmtKind::Invoke(ref invoke) => invoke
                .recv
                .into_iter()
                .chain(invoke.args.iter().cloned())
                .collect(),
            StmtKind::If { ref cond } => cond.uses(),
            StmtKind::Switch { var, .. } => vec![var],
            StmtKind::Return { value } => value.into_iter().collect(),
        }
    }

    /// The call site carried by this statement, if it is one.
    pub fn invoke(&self) -> Option<&Invoke> {
        match self.kind {
            StmtKind::Invoke(ref invoke) => Some(invoke),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, StmtKind::Invoke(_))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            StmtKind::Nop => write!(f, "nop"),
            StmtKind::Assign { lhs, ref rhs } => write!(f, "{} = {}", lhs, rhs),
            StmtKind::New { lhs, .. } => write!(f, "{} = new", lhs),
            StmtKind::Cast { lhs, rhs, .. } => write!(f, "{} = cast {}", lhs, rhs),
            StmtKind::LoadField { lhs, base: Some(base), field } => {
                write!(f, "{} = {}.f{}", lhs, base, field.index())
            }
            StmtKind::LoadField { lhs, base: None, field } => {
                write!(f, "{} = f{}", lhs, field.index())
            }
            StmtKind::StoreField { base: Some(base), field, rhs } => {
                write!(f, "{}.f{} = {}", base, field.index(), rhs)
            }
            StmtKind::StoreField { base: None, field, rhs } => {
                write!(f, "f{} = {}", field.index(), rhs)
            }
            StmtKind::LoadArray { lhs, base, index } => {
                write!(f, "{} = {}[{}]", lhs, base, index)
            }
            StmtKind::StoreArray { base, index, rhs } => {
                write!(f, "{}[{}] = {}", base, index, rhs)
            }
            StmtKind::Invoke(ref invoke) => {
                if let Some(result) = invoke.result {
                    write!(f, "{} = ", result)?;
                }
                if let Some(recv) = invoke.recv {
                    write!(f, "{}.", recv)?;
                }
                write!(f, "{}(", invoke.method_ref.subsignature)?;
                for (i, arg) in invoke.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            StmtKind::If { ref cond } => write!(f, "if {}", cond),
            StmtKind::Goto => write!(f, "goto"),
            StmtKind::Switch { var, .. } => write!(f, "switch {}", var),
            StmtKind::Return { value: Some(v) } => write!(f, "return {}", v),
            StmtKind::Return { value: None } => write!(f, "return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinaryOp;

    #[test]
    fn def_and_uses() {
        let stmt = Stmt::new(
            0,
            StmtKind::Assign {
                lhs: VarId(0),
                rhs: Exp::Binary {
                    op: BinaryOp::Add,
                    lhs: VarId(1),
                    rhs: VarId(2),
                },
            },
        );
        assert_eq!(stmt.def(), Some(VarId(0)));
        assert_eq!(stmt.uses(), vec![VarId(1), VarId(2)]);

        let store = Stmt::new(
            1,
            StmtKind::StoreField {
                base: Some(VarId(3)),
                field: FieldId(0),
                rhs: VarId(4),
            },
        );
        assert_eq!(store.def(), None);
        assert_eq!(store.uses(), vec![VarId(3), VarId(4)]);
    }
}
