//! Dead-code detection: unreachable statements and useless assignments.

use std::collections::{BTreeSet, VecDeque};

use crate::analysis::constprop::{self, CPFact};
use crate::analysis::dataflow::{DataflowResult, SetFact};
use crate::analysis::live_vars;
use crate::ir::{BinaryOp, CfgEdgeKind, Exp, Method, MethodId, Program, StmtKind, VarId};
use crate::Error;

/// Detects dead code in a method: statements unreachable from the entry
/// once constant branches are pruned, plus side-effect-free assignments
/// whose result is never used. Returns statement indices, ordered. The
/// CFG exit is never reported.
pub fn dead_code(program: &Program, method_id: MethodId) -> Result<BTreeSet<usize>, Error> {
    let method = program.method(method_id);
    let constants = constprop::constants(program, method)?;
    let live = live_vars::live_variables(method)?;

    let mut dead = BTreeSet::new();
    unreachable_code(method, &constants, &mut dead);
    dead_assignments(method, &live, &mut dead);
    Ok(dead)
}

/// Breadth-first traversal from the CFG entry, following only the branch
/// edges a constant condition allows. Unvisited statements are dead.
fn unreachable_code(method: &Method, constants: &DataflowResult<CPFact>, dead: &mut BTreeSet<usize>) {
    let cfg = method.cfg();
    let mut visited = vec![false; cfg.node_count()];
    let mut queue = VecDeque::from([cfg.entry()]);

    while let Some(node) = queue.pop_front() {
        if visited[node] {
            continue;
        }
        visited[node] = true;

        let stmt = cfg.node_stmt(node).map(|i| method.stmt(i));
        match stmt.map(|s| s.kind()) {
            Some(StmtKind::If { cond }) => {
                let value = constprop::evaluate(cond, constants.out_fact(node));
                match value.const_value() {
                    Some(c) => {
                        let is_true = c == 1;
                        for edge in cfg.out_edges(node) {
                            match edge.kind {
                                CfgEdgeKind::IfTrue if is_true => queue.push_back(edge.target),
                                CfgEdgeKind::IfFalse if !is_true => queue.push_back(edge.target),
                                _ => {}
                            }
                        }
                    }
                    None => queue.extend(cfg.successors(node)),
                }
            }
            Some(StmtKind::Switch { var, cases }) => {
                let value = constprop::evaluate(&Exp::Var(*var), constants.out_fact(node));
                match value.const_value() {
                    Some(c) if cases.contains(&c) => {
                        for edge in cfg.out_edges(node) {
                            if edge.kind == CfgEdgeKind::SwitchCase(c) {
                                queue.push_back(edge.target);
                            }
                        }
                    }
                    Some(_) => {
                        for edge in cfg.out_edges(node) {
                            if edge.kind == CfgEdgeKind::SwitchDefault {
                                queue.push_back(edge.target);
                            }
                        }
                    }
                    None => queue.extend(cfg.successors(node)),
                }
            }
            _ => queue.extend(cfg.successors(node)),
        }
    }

    for i in 0..method.stmts().len() {
        if !visited[i] {
            dead.insert(i);
        }
    }
}

/// An assignment whose defined variable is not live out and whose
/// right-hand side cannot raise is dead.
fn dead_assignments(method: &Method, live: &DataflowResult<SetFact<VarId>>, dead: &mut BTreeSet<usize>) {
    for (i, stmt) in method.stmts().iter().enumerate() {
        if let StmtKind::Assign { lhs, ref rhs } = *stmt.kind() {
            if has_no_side_effect(rhs) && !live.out_fact(i).contains(&lhs) {
                dead.insert(i);
            }
        }
    }
}

// Division and remainder may raise; allocations, casts, and heap accesses
// are modeled as separate statement kinds and never reach here.
fn has_no_side_effect(rhs: &Exp) -> bool {
    match *rhs {
        Exp::Binary { op, .. } => op != BinaryOp::Div && op != BinaryOp::Rem,
        Exp::Var(_) | Exp::IntLiteral(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ProgramBuilder, Type};

    /// if (1 == 1) { live } else { dead }
    #[test]
    fn constant_branch_prunes_else() {
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "main()", true);
        let a = m.var("a", Type::int());
        let b = m.var("b", Type::int());
        let r = m.var("r", Type::int());

        // 0: a = 1
        m.stmt(StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(1),
        });
        // 1: b = 1
        m.stmt(StmtKind::Assign {
            lhs: b,
            rhs: Exp::IntLiteral(1),
        });
        // 2: if (a == b) goto 3 else 4
        let if_stmt = m.stmt(StmtKind::If {
            cond: Exp::Binary {
                op: BinaryOp::Eq,
                lhs: a,
                rhs: b,
            },
        });
        // 3: r = 1; goto 5
        let then_stmt = m.stmt(StmtKind::Assign {
            lhs: r,
            rhs: Exp::IntLiteral(1),
        });
        // 4: r = 0
        let else_stmt = m.stmt(StmtKind::Assign {
            lhs: r,
            rhs: Exp::IntLiteral(0),
        });
        // 5: return r
        let ret = m.stmt(StmtKind::Return { value: Some(r) });

        m.edge(if_stmt, then_stmt, CfgEdgeKind::IfTrue);
        m.edge(if_stmt, else_stmt, CfgEdgeKind::IfFalse);
        m.edge(then_stmt, ret, CfgEdgeKind::Goto);
        let m = m.finish();
        let program = builder.finish();

        let dead = dead_code(&program, m).unwrap();
        assert!(dead.contains(&else_stmt));
        assert!(!dead.contains(&then_stmt));
        assert!(!dead.contains(&ret));
    }

    /// A side-effect-free assignment to a variable that is never used is
    /// dead; a division is kept even if unused.
    #[test]
    fn dead_assignment() {
        let mut builder = ProgramBuilder::new();
        let class = builder.add_class("Main", None);
        let mut m = builder.method(class, "main()", true);
        let a = m.var("a", Type::int());
        let b = m.var("b", Type::int());
        let c = m.var("c", Type::int());
        let d = m.var("d", Type::int());

        // 0: a = 1   (used below, live)
        m.stmt(StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(1),
        });
        // 1: b = a + a   (never used: dead)
        let dead_add = m.stmt(StmtKind::Assign {
            lhs: b,
            rhs: Exp::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: a,
            },
        });
        // 2: c = a / a   (never used but may raise: kept)
        let kept_div = m.stmt(StmtKind::Assign {
            lhs: c,
            rhs: Exp::Binary {
                op: BinaryOp::Div,
                lhs: a,
                rhs: a,
            },
        });
        // 3: d = a   (used by return, live)
        m.stmt(StmtKind::Assign {
            lhs: d,
            rhs: Exp::Var(a),
        });
        m.stmt(StmtKind::Return { value: Some(d) });
        let m = m.finish();
        let program = builder.finish();

        let dead = dead_code(&program, m).unwrap();
        assert!(dead.contains(&dead_add));
        assert!(!dead.contains(&kept_div));
        assert!(!dead.contains(&3));
    }
}
