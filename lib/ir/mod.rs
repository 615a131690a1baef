//! Shrike Intermediate Representation
//!
//! A program is a set of classes arranged in a hierarchy, holding fields and
//! methods; a method body is a sequence of three-address statements with a
//! control-flow graph over them. All entities live in arenas owned by
//! [`Program`] and are referenced by index.

pub mod builder;
pub mod cfg;
pub mod exp;
pub mod icfg;
pub mod program;
pub mod stmt;
pub mod types;

pub use self::builder::{MethodBuilder, ProgramBuilder};
pub use self::cfg::{Cfg, CfgEdge, CfgEdgeKind};
pub use self::exp::{BinaryOp, Exp};
pub use self::icfg::{Icfg, IcfgEdge, IcfgEdgeKind, IcfgNode};
pub use self::program::{Class, Field, Method, Program, Var};
pub use self::stmt::{Invoke, InvokeKind, MethodRef, Stmt, StmtKind};
pub use self::types::{ClassId, FieldId, MethodId, PrimitiveType, Site, Type, VarId};
