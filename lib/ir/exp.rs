//! Expressions appearing on the right-hand side of assignments and in
//! branch conditions. Operands are always variables: the IR is in
//! three-address form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ir::VarId;

/// A binary operator with 32-bit two's-complement integer semantics.
/// Comparison operators yield 1 or 0.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// True for `/` and `%`, whose evaluation can raise at runtime.
    pub fn is_division(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }

    /// Applies this operator to two concrete operands. The caller is
    /// responsible for never passing a zero right operand to `/` or `%`.
    /// Shift distances are masked to five bits.
    pub fn apply(self, lhs: i32, rhs: i32) -> i32 {
        match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => lhs.wrapping_div(rhs),
            BinaryOp::Rem => lhs.wrapping_rem(rhs),
            BinaryOp::Eq => (lhs == rhs) as i32,
            BinaryOp::Ne => (lhs != rhs) as i32,
            BinaryOp::Lt => (lhs < rhs) as i32,
            BinaryOp::Gt => (lhs > rhs) as i32,
            BinaryOp::Le => (lhs <= rhs) as i32,
            BinaryOp::Ge => (lhs >= rhs) as i32,
            BinaryOp::Shl => lhs.wrapping_shl(rhs as u32),
            BinaryOp::Shr => lhs.wrapping_shr(rhs as u32),
            BinaryOp::Ushr => (lhs as u32).wrapping_shr(rhs as u32) as i32,
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        };
        write!(f, "{}", s)
    }
}

/// A right-hand-side expression.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Exp {
    Var(VarId),
    IntLiteral(i32),
    Binary { op: BinaryOp, lhs: VarId, rhs: VarId },
}

impl Exp {
    /// Every variable this expression reads.
    pub fn uses(&self) -> Vec<VarId> {
        match *self {
            Exp::Var(v) => vec![v],
            Exp::IntLiteral(_) => vec![],
            Exp::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exp::Var(v) => write!(f, "{}", v),
            Exp::IntLiteral(c) => write!(f, "{}", c),
            Exp::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
        }
    }
}
