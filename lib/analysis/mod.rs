//! Implementations of static analyses over Shrike IR.
//!
//! * **callgraph** - Call graphs and the class-hierarchy-analysis builder.
//! * **dataflow** - The generic intra-procedural fixed-point solver.
//! * **live_vars** - May live-variable analysis.
//! * **constprop** - Intra-procedural constant propagation.
//! * **pta** - Context-insensitive and context-sensitive pointer analyses,
//!   with the taint overlay.
//! * **inter_constprop** - Inter-procedural constant propagation over the
//!   ICFG, heap-aware through pointer-analysis results.
//! * **dead_code** - Dead-code detection.

pub mod callgraph;
pub mod constprop;
pub mod dataflow;
pub mod dead_code;
pub mod inter_constprop;
pub mod live_vars;
pub mod pta;
