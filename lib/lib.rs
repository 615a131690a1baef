//! Shrike: A Whole-Program Static Analysis Framework in Rust.
//!
//! Shrike implements fixed-point analyses over a typed, object-oriented
//! intermediate representation in three-address form. A quick synopsis of
//! Shrike's modules:
//!
//! * **analysis** - Call-graph construction, intra- and inter-procedural
//!   data-flow analyses, pointer analyses, taint tracking, and dead-code
//!   detection.
//! * **graph** - A simple directed graph library.
//! * **ir** - Shrike's intermediate representation: programs, classes,
//!   methods, statements, and their control-flow graphs.
//!
//! Programs are assembled through a [`ir::ProgramBuilder`] and handed to
//! the analyses, each of which runs to a fixed point on a single thread
//! and publishes an immutable result.
//!
//! ```
//! use shrike::analysis::callgraph;
//! use shrike::ir::{ProgramBuilder, StmtKind};
//!
//! # fn example() -> Result<(), shrike::Error> {
//! let mut builder = ProgramBuilder::new();
//! let class = builder.add_class("Main", None);
//! let mut main = builder.method(class, "main()", true);
//! main.stmt(StmtKind::Return { value: None });
//! let main = main.finish();
//! builder.set_entry(main);
//! let program = builder.finish();
//!
//! let call_graph = callgraph::cha_call_graph(&program)?;
//! assert_eq!(call_graph.reachable_methods(), [main]);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod error;
pub mod graph;
pub mod ir;

#[cfg(test)]
mod tests;

pub use error::Error;
