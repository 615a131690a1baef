//! Constant propagation for integer-valued variables.
//!
//! Values form a three-level lattice: UNDEF below single constants below
//! NAC ("not a constant"). The analysis is forward; the boundary fact maps
//! every int-holding parameter to NAC.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::analysis::dataflow::{self, DataflowAnalysis, DataflowResult};
use crate::ir::{Exp, Method, Program, Stmt, StmtKind, VarId};
use crate::Error;

/// A lattice value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Value {
    Undef,
    Const(i32),
    Nac,
}

impl Value {
    pub fn is_undef(self) -> bool {
        self == Value::Undef
    }

    pub fn is_const(self) -> bool {
        matches!(self, Value::Const(_))
    }

    pub fn is_nac(self) -> bool {
        self == Value::Nac
    }

    pub fn const_value(self) -> Option<i32> {
        match self {
            Value::Const(c) => Some(c),
            Value::Undef | Value::Nac => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Const(c) => write!(f, "{}", c),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

/// Meets two values. NAC absorbs, UNDEF is the identity, and distinct
/// constants meet to NAC.
pub fn meet_value(v1: Value, v2: Value) -> Value {
    match (v1, v2) {
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        (Value::Const(a), Value::Const(b)) => {
            if a == b {
                Value::Const(a)
            } else {
                Value::Nac
            }
        }
        (Value::Const(c), Value::Undef) | (Value::Undef, Value::Const(c)) => Value::Const(c),
        (Value::Undef, Value::Undef) => Value::Undef,
    }
}

/// A partial map from variables to values. A missing key reads as UNDEF,
/// and UNDEF is never stored, so equality is semantic.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CPFact {
    values: BTreeMap<VarId, Value>,
}

impl CPFact {
    pub fn new() -> CPFact {
        CPFact::default()
    }

    pub fn get(&self, var: VarId) -> Value {
        self.values.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Binds `var` to `value`. Binding UNDEF removes the entry. Returns
    /// true if the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            self.values.remove(&var).is_some()
        } else {
            self.values.insert(var, value) != Some(value)
        }
    }

    pub fn remove(&mut self, var: VarId) -> bool {
        self.values.remove(&var).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, Value)> + '_ {
        self.values.iter().map(|(&var, &value)| (var, value))
    }
}

/// Meets every binding of `fact` into `target`.
pub fn meet_into(fact: &CPFact, target: &mut CPFact) {
    for (var, value) in fact.iter() {
        target.update(var, meet_value(value, target.get(var)));
    }
}

/// Evaluates an expression against a fact.
///
/// Division and remainder by a constant zero yield UNDEF, even when the
/// other operand is NAC.
pub fn evaluate(exp: &Exp, fact: &CPFact) -> Value {
    match *exp {
        Exp::Var(var) => fact.get(var),
        Exp::IntLiteral(c) => Value::Const(c),
        Exp::Binary { op, lhs, rhs } => {
            let v1 = fact.get(lhs);
            let v2 = fact.get(rhs);
            match (v1, v2) {
                (Value::Const(a), Value::Const(b)) => {
                    if op.is_division() && b == 0 {
                        Value::Undef
                    } else {
                        Value::Const(op.apply(a, b))
                    }
                }
                (Value::Nac, _) | (_, Value::Nac) => {
                    if op.is_division() && v2 == Value::Const(0) {
                        Value::Undef
                    } else {
                        Value::Nac
                    }
                }
                _ => Value::Undef,
            }
        }
    }
}

/// Computes constant values for every CFG node of the given method.
/// Heap loads, calls, allocations, and casts are treated as NAC.
pub fn constants(program: &Program, method: &Method) -> Result<DataflowResult<CPFact>, Error> {
    dataflow::solve(&ConstantPropagation::new(program), method)
}

/// The intra-procedural constant propagation analysis.
pub struct ConstantPropagation<'a> {
    program: &'a Program,
}

impl<'a> ConstantPropagation<'a> {
    pub fn new(program: &'a Program) -> ConstantPropagation<'a> {
        ConstantPropagation { program }
    }

    fn rhs_value(&self, stmt: &Stmt, fact: &CPFact) -> Value {
        match *stmt.kind() {
            StmtKind::Assign { ref rhs, .. } => evaluate(rhs, fact),
            // anything that reaches through the heap or a callee is
            // unknown intra-procedurally
            _ => Value::Nac,
        }
    }
}

impl<'a> DataflowAnalysis for ConstantPropagation<'a> {
    type Fact = CPFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn boundary_fact(&self, method: &Method) -> CPFact {
        let mut fact = CPFact::new();
        for &param in method.params() {
            if self.program.var(param).ty().can_hold_int() {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    fn initial_fact(&self) -> CPFact {
        CPFact::new()
    }

    fn meet_into(&self, fact: &CPFact, target: &mut CPFact) {
        meet_into(fact, target);
    }

    fn transfer(&self, stmt: Option<&Stmt>, in_fact: &CPFact, out: &mut CPFact) -> bool {
        let mut updated = in_fact.clone();
        if let Some(stmt) = stmt {
            if let Some(def) = stmt.def() {
                if self.program.var(def).ty().can_hold_int() {
                    updated.update(def, self.rhs_value(stmt, in_fact));
                }
            }
        }
        let changed = *out != updated;
        *out = updated;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, ProgramBuilder, Type};

    #[test]
    fn meet_laws() {
        let values = [Value::Undef, Value::Const(1), Value::Const(2), Value::Nac];
        for &v1 in &values {
            for &v2 in &values {
                // commutativity
                assert_eq!(meet_value(v1, v2), meet_value(v2, v1));
                // idempotence through associativity with itself
                assert_eq!(meet_value(meet_value(v1, v2), v2), meet_value(v1, v2));
            }
            // UNDEF is the identity, NAC absorbs
            assert_eq!(meet_value(v1, Value::Undef), v1);
            assert_eq!(meet_value(v1, Value::Nac), Value::Nac);
        }
        assert_eq!(
            meet_value(Value::Const(1), Value::Const(2)),
            Value::Nac
        );
    }

    #[test]
    fn division_by_constant_zero_is_undef() {
        let mut fact = CPFact::new();
        let a = VarId(0);
        let b = VarId(1);
        fact.update(a, Value::Const(7));
        fact.update(b, Value::Const(0));

        let div = Exp::Binary {
            op: BinaryOp::Div,
            lhs: a,
            rhs: b,
        };
        assert_eq!(evaluate(&div, &fact), Value::Undef);

        // a NAC dividend does not rescue a constant-zero divisor
        fact.update(a, Value::Nac);
        assert_eq!(evaluate(&div, &fact), Value::Undef);

        // but a NAC divisor is NAC
        fact.update(b, Value::Nac);
        assert_eq!(evaluate(&div, &fact), Value::Nac);
    }

    #[test]
    fn semantic_equality_ignores_undef() {
        let mut f1 = CPFact::new();
        let mut f2 = CPFact::new();
        f1.update(VarId(0), Value::Const(3));
        f2.update(VarId(0), Value::Const(3));
        f2.update(VarId(1), Value::Undef);
        assert_eq!(f1, f2);
    }

    /// x = 2; y = x + 3; z = x * y; leaves x -> 2, y -> 5, z -> 10.
    #[test]
    fn straight_line_constants() {
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "main()", true);
        let x = m.var("x", Type::int());
        let t = m.var("t", Type::int());
        let y = m.var("y", Type::int());
        let z = m.var("z", Type::int());
        m.stmt(StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(2),
        });
        m.stmt(StmtKind::Assign {
            lhs: t,
            rhs: Exp::IntLiteral(3),
        });
        m.stmt(StmtKind::Assign {
            lhs: y,
            rhs: Exp::Binary {
                op: BinaryOp::Add,
                lhs: x,
                rhs: t,
            },
        });
        let last = m.stmt(StmtKind::Assign {
            lhs: z,
            rhs: Exp::Binary {
                op: BinaryOp::Mul,
                lhs: x,
                rhs: y,
            },
        });
        m.stmt(StmtKind::Return { value: Some(z) });
        let m = m.finish();
        let program = builder.finish();

        let result = constants(&program, program.method(m)).unwrap();
        let out = result.out_fact(last);
        assert_eq!(out.get(x), Value::Const(2));
        assert_eq!(out.get(y), Value::Const(5));
        assert_eq!(out.get(z), Value::Const(10));
    }

    /// Parameters are NAC at the boundary, and a join of two distinct
    /// constants is NAC.
    #[test]
    fn param_boundary_is_nac() {
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "f(int)", true);
        let p = m.param("p", Type::int());
        m.stmt(StmtKind::Return { value: Some(p) });
        let m = m.finish();
        let program = builder.finish();

        let result = constants(&program, program.method(m)).unwrap();
        assert_eq!(result.in_fact(0).get(p), Value::Nac);
    }
}
