//! Taint configuration, taint objects, and taint flows.
//!
//! The configuration names source methods (whose results are tainted),
//! sink methods (whose arguments are observed), and transfer methods
//! (which move taint between receiver, arguments, and result). It is
//! loaded from JSON and resolved against the program; entries that name
//! unknown classes, methods, or types are logged and skipped.

use log::warn;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::analysis::pta::{HeapModel, ObjId, ObjKind};
use crate::ir::{MethodId, PrimitiveType, Program, Site, Type};
use crate::Error;

/// An operand position in a taint transfer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TransferPoint {
    Base,
    Result,
    Arg(usize),
}

/// A resolved taint transfer for some method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transfer {
    pub from: TransferPoint,
    pub to: TransferPoint,
    pub ty: Type,
}

/// A witness that a source call's taint reaches a sink argument.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Serialize)]
pub struct TaintFlow {
    pub source: Site,
    pub sink: Site,
    pub index: usize,
}

impl fmt::Display for TaintFlow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "taint flow: {} -> {} (arg {})",
            self.source, self.sink, self.index
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Index(usize),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct RawSource {
    class: String,
    method: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawSink {
    class: String,
    method: String,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct RawTransfer {
    class: String,
    method: String,
    from: RawPoint,
    to: RawPoint,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawTaintConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    sinks: Vec<RawSink>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

/// A taint configuration resolved against a program.
#[derive(Clone, Debug, Default)]
pub struct TaintConfig {
    sources: FxHashMap<MethodId, Type>,
    sinks: FxHashMap<MethodId, BTreeSet<usize>>,
    transfers: FxHashMap<MethodId, Vec<Transfer>>,
}

impl TaintConfig {
    /// Parses a JSON configuration and resolves it against `program`.
    /// Unresolvable entries are reported and skipped.
    pub fn from_json(json: &str, program: &Program) -> Result<TaintConfig, Error> {
        let raw: RawTaintConfig = serde_json::from_str(json)?;
        let mut config = TaintConfig::default();

        for source in raw.sources {
            match (
                resolve_method(program, &source.class, &source.method),
                resolve_type(program, &source.ty),
            ) {
                (Some(method), Some(ty)) => {
                    config.sources.insert(method, ty);
                }
                _ => warn!(
                    "skipping taint source {}.{}: unresolved method or type",
                    source.class, source.method
                ),
            }
        }

        for sink in raw.sinks {
            match resolve_method(program, &sink.class, &sink.method) {
                Some(method) => {
                    config.sinks.entry(method).or_default().insert(sink.index);
                }
                None => warn!(
                    "skipping taint sink {}.{}: unresolved method",
                    sink.class, sink.method
                ),
            }
        }

        for transfer in raw.transfers {
            let method = resolve_method(program, &transfer.class, &transfer.method);
            let ty = resolve_type(program, &transfer.ty);
            let from = resolve_point(&transfer.from);
            let to = resolve_point(&transfer.to);
            match (method, ty, from, to) {
                (Some(method), Some(ty), Some(from), Some(to)) => {
                    config
                        .transfers
                        .entry(method)
                        .or_default()
                        .push(Transfer { from, to, ty });
                }
                _ => warn!(
                    "skipping taint transfer {}.{}: unresolved entry",
                    transfer.class, transfer.method
                ),
            }
        }

        Ok(config)
    }

    /// The taint type minted when the method is called as a source.
    pub fn source_type(&self, method: MethodId) -> Option<&Type> {
        self.sources.get(&method)
    }

    /// The sink argument indices configured for a method.
    pub fn sink_indices(&self, method: MethodId) -> impl Iterator<Item = usize> + '_ {
        self.sinks
            .get(&method)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The transfers configured for a method.
    pub fn transfers_of(&self, method: MethodId) -> &[Transfer] {
        self.transfers
            .get(&method)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn resolve_method(program: &Program, class: &str, subsignature: &str) -> Option<MethodId> {
    let class = program.find_class(class)?;
    program.declared_method(class, subsignature)
}

fn resolve_type(program: &Program, name: &str) -> Option<Type> {
    match name {
        "void" => Some(Type::Void),
        "boolean" => Some(Type::Primitive(PrimitiveType::Boolean)),
        "byte" => Some(Type::Primitive(PrimitiveType::Byte)),
        "char" => Some(Type::Primitive(PrimitiveType::Char)),
        "short" => Some(Type::Primitive(PrimitiveType::Short)),
        "int" => Some(Type::Primitive(PrimitiveType::Int)),
        "long" => Some(Type::Primitive(PrimitiveType::Long)),
        _ => program.find_class(name).map(Type::Reference),
    }
}

fn resolve_point(raw: &RawPoint) -> Option<TransferPoint> {
    match raw {
        RawPoint::Index(i) => Some(TransferPoint::Arg(*i)),
        RawPoint::Name(name) => match name.as_str() {
            "base" => Some(TransferPoint::Base),
            "result" => Some(TransferPoint::Result),
            _ => None,
        },
    }
}

/// Mints and interns taint objects: one per (source call, type).
#[derive(Clone, Debug, Default)]
pub struct TaintManager {
    taints: FxHashMap<(Site, Type), ObjId>,
}

impl TaintManager {
    pub fn new() -> TaintManager {
        TaintManager::default()
    }

    /// The taint object for a source call and carried type.
    pub fn make_taint(&mut self, heap: &mut HeapModel, source: Site, ty: Type) -> ObjId {
        if let Some(&obj) = self.taints.get(&(source, ty.clone())) {
            return obj;
        }
        let obj = heap.mock_obj(ObjKind::Taint { source }, ty.clone());
        self.taints.insert((source, ty), obj);
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ProgramBuilder, StmtKind};

    fn program_with_source() -> (Program, MethodId) {
        let mut builder = ProgramBuilder::new();
        let string = builder.add_class("String", None);
        let secret = builder.add_class("Secret", None);
        let mut m = builder.method(secret, "read()", true);
        m.set_return_ty(Type::Reference(string));
        m.stmt(StmtKind::Return { value: None });
        let read = m.finish();
        (builder.finish(), read)
    }

    #[test]
    fn parses_and_resolves() {
        let (program, read) = program_with_source();
        let json = r#"{
            "sources": [{"class": "Secret", "method": "read()", "type": "String"}],
            "sinks": [{"class": "Secret", "method": "read()", "index": 0}],
            "transfers": [
                {"class": "Secret", "method": "read()", "from": 0, "to": "result", "type": "String"}
            ]
        }"#;
        let config = TaintConfig::from_json(json, &program).unwrap();
        let string = program.find_class("String").unwrap();
        assert_eq!(config.source_type(read), Some(&Type::Reference(string)));
        assert_eq!(config.sink_indices(read).collect::<Vec<_>>(), vec![0]);
        assert_eq!(
            config.transfers_of(read),
            &[Transfer {
                from: TransferPoint::Arg(0),
                to: TransferPoint::Result,
                ty: Type::Reference(string),
            }]
        );
    }

    #[test]
    fn unresolved_entries_are_skipped() {
        let (program, read) = program_with_source();
        let json = r#"{
            "sources": [
                {"class": "Nope", "method": "read()", "type": "String"},
                {"class": "Secret", "method": "read()", "type": "String"}
            ],
            "sinks": [{"class": "Secret", "method": "gone()", "index": 1}]
        }"#;
        let config = TaintConfig::from_json(json, &program).unwrap();
        assert!(config.source_type(read).is_some());
        assert_eq!(config.sink_indices(read).count(), 0);
    }

    #[test]
    fn one_taint_obj_per_source_and_type() {
        let (program, _) = program_with_source();
        let string = Type::Reference(program.find_class("String").unwrap());
        let mut heap = HeapModel::new();
        let mut manager = TaintManager::new();
        let site = Site::new(MethodId(0), 0);

        let t1 = manager.make_taint(&mut heap, site, string.clone());
        let t2 = manager.make_taint(&mut heap, site, string.clone());
        assert_eq!(t1, t2);
        assert!(heap.is_taint(t1));
        assert_eq!(heap.obj(t1).taint_source(), Some(site));

        let t3 = manager.make_taint(&mut heap, site, Type::int());
        assert_ne!(t1, t3);
    }
}
