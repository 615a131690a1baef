//! A fixed-point engine for intra-procedural data-flow analysis.

use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::fmt::Debug;

use crate::ir::{Method, Stmt};
use crate::Error;

const DEFAULT_MAX_ANALYSIS_STEPS: usize = 250_000;

/// A flow-sensitive analysis driven to a fixed point over a method's CFG.
///
/// `transfer` receives the facts in direction order: for a forward
/// analysis `input` is the IN fact and `output` the OUT fact; for a
/// backward analysis the roles are swapped. `stmt` is `None` at the
/// synthetic entry and exit nodes.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq + Debug;

    fn is_forward(&self) -> bool;

    /// The fact at the boundary: the entry node of a forward analysis, the
    /// exit node of a backward one.
    fn boundary_fact(&self, method: &Method) -> Self::Fact;

    fn initial_fact(&self) -> Self::Fact;

    /// Meets `fact` into `target`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Applies the node transfer, writing `output`. Returns true if
    /// `output` changed.
    fn transfer(&self, stmt: Option<&Stmt>, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}

/// Per-node IN/OUT facts of a completed analysis, indexed by CFG node.
#[derive(Clone, Debug)]
pub struct DataflowResult<F> {
    in_facts: Vec<F>,
    out_facts: Vec<F>,
}

impl<F> DataflowResult<F> {
    pub fn in_fact(&self, node: usize) -> &F {
        &self.in_facts[node]
    }

    pub fn out_fact(&self, node: usize) -> &F {
        &self.out_facts[node]
    }
}

/// A work-list data-flow analysis algorithm.
pub fn solve<A: DataflowAnalysis>(
    analysis: &A,
    method: &Method,
) -> Result<DataflowResult<A::Fact>, Error> {
    let cfg = method.cfg();
    let node_count = cfg.node_count();
    let forward = analysis.is_forward();

    let mut in_facts = vec![analysis.initial_fact(); node_count];
    let mut out_facts = vec![analysis.initial_fact(); node_count];

    let boundary_node = if forward { cfg.entry() } else { cfg.exit() };
    let boundary = analysis.boundary_fact(method);
    in_facts[boundary_node] = boundary.clone();
    out_facts[boundary_node] = boundary;

    let mut queue: VecDeque<usize> = (0..node_count).filter(|&n| n != boundary_node).collect();
    let mut queued = vec![true; node_count];
    queued[boundary_node] = false;

    let mut steps = 0;
    while let Some(node) = queue.pop_front() {
        if steps > DEFAULT_MAX_ANALYSIS_STEPS {
            return Err(Error::Analysis(
                "data-flow analysis exceeded max steps".to_string(),
            ));
        }
        steps += 1;
        queued[node] = false;

        let stmt = cfg.node_stmt(node).map(|i| method.stmt(i));

        let changed = if forward {
            for pred in cfg.predecessors(node) {
                analysis.meet_into(&out_facts[pred], &mut in_facts[node]);
            }
            analysis.transfer(stmt, &in_facts[node], &mut out_facts[node])
        } else {
            for succ in cfg.successors(node) {
                analysis.meet_into(&in_facts[succ], &mut out_facts[node]);
            }
            analysis.transfer(stmt, &out_facts[node], &mut in_facts[node])
        };

        if changed {
            let next = if forward {
                cfg.successors(node)
            } else {
                cfg.predecessors(node)
            };
            for n in next {
                if n != boundary_node && !queued[n] {
                    queued[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    Ok(DataflowResult {
        in_facts,
        out_facts,
    })
}

/// A set-valued data-flow fact.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SetFact<T: Ord> {
    items: BTreeSet<T>,
}

impl<T: Ord + Clone> SetFact<T> {
    pub fn new() -> SetFact<T> {
        SetFact {
            items: BTreeSet::new(),
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn add(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.items.remove(item)
    }

    /// Unions `other` into this fact.
    pub fn union(&mut self, other: &SetFact<T>) {
        for item in &other.items {
            self.items.insert(item.clone());
        }
    }

    /// Makes this fact a copy of `other`.
    pub fn set_to(&mut self, other: &SetFact<T>) {
        self.items = other.items.clone();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Ord + Clone> Default for SetFact<T> {
    fn default() -> SetFact<T> {
        SetFact::new()
    }
}
