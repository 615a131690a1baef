//! Classic may live-variable analysis.

use crate::analysis::dataflow::{self, DataflowAnalysis, DataflowResult, SetFact};
use crate::ir::{Method, Stmt, VarId};
use crate::Error;

/// Computes, for every CFG node of the given method, the set of variables
/// live before and after it.
pub fn live_variables(method: &Method) -> Result<DataflowResult<SetFact<VarId>>, Error> {
    dataflow::solve(&LiveVariables, method)
}

struct LiveVariables;

impl DataflowAnalysis for LiveVariables {
    type Fact = SetFact<VarId>;

    fn is_forward(&self) -> bool {
        false
    }

    fn boundary_fact(&self, _method: &Method) -> SetFact<VarId> {
        SetFact::new()
    }

    fn initial_fact(&self) -> SetFact<VarId> {
        SetFact::new()
    }

    fn meet_into(&self, fact: &SetFact<VarId>, target: &mut SetFact<VarId>) {
        target.union(fact);
    }

    // in = (out \ def) ∪ use
    fn transfer(
        &self,
        stmt: Option<&Stmt>,
        out: &SetFact<VarId>,
        in_fact: &mut SetFact<VarId>,
    ) -> bool {
        let mut updated = out.clone();
        if let Some(stmt) = stmt {
            if let Some(def) = stmt.def() {
                updated.remove(&def);
            }
            for var in stmt.uses() {
                updated.add(var);
            }
        }
        let changed = *in_fact != updated;
        in_fact.set_to(&updated);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Exp, ProgramBuilder, StmtKind, Type};

    #[test]
    fn live_in_equation_holds() {
        // a = 1; b = a + a; return b
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "main()", true);
        let a = m.var("a", Type::int());
        let b = m.var("b", Type::int());
        m.stmt(StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(1),
        });
        m.stmt(StmtKind::Assign {
            lhs: b,
            rhs: Exp::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: a,
            },
        });
        m.stmt(StmtKind::Return { value: Some(b) });
        let m = m.finish();
        let program = builder.finish();

        let method = program.method(m);
        let live = live_variables(method).unwrap();

        // a is live into the addition but not out of it
        assert!(live.in_fact(1).contains(&a));
        assert!(!live.out_fact(1).contains(&a));
        assert!(live.out_fact(1).contains(&b));
        // nothing is live into the literal assignment except what it uses
        assert!(!live.in_fact(0).contains(&b));

        // liveIn(s) = (liveOut(s) \ def(s)) ∪ use(s) at every statement
        for (i, stmt) in method.stmts().iter().enumerate() {
            let mut expected = live.out_fact(i).clone();
            if let Some(def) = stmt.def() {
                expected.remove(&def);
            }
            for var in stmt.uses() {
                expected.add(var);
            }
            assert_eq!(*live.in_fact(i), expected);
        }
    }
}
