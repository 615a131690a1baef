//! The heap model: abstract objects identified by their allocation site.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ir::{Site, Type};

/// The index of an abstract object in its `HeapModel`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ObjId(pub usize);

impl ObjId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// What an abstract object stands for.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ObjKind {
    /// A `New` statement's allocation.
    Alloc { site: Site },
    /// A taint marker minted for a source call.
    Taint { source: Site },
}

/// An abstract heap object.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Obj {
    kind: ObjKind,
    ty: Type,
}

impl Obj {
    pub fn kind(&self) -> &ObjKind {
        &self.kind
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_taint(&self) -> bool {
        matches!(self.kind, ObjKind::Taint { .. })
    }

    /// The allocation site, for allocation objects.
    pub fn alloc_site(&self) -> Option<Site> {
        match self.kind {
            ObjKind::Alloc { site } => Some(site),
            ObjKind::Taint { .. } => None,
        }
    }

    /// The source call site, for taint objects.
    pub fn taint_source(&self) -> Option<Site> {
        match self.kind {
            ObjKind::Taint { source } => Some(source),
            ObjKind::Alloc { .. } => None,
        }
    }
}

/// Maps allocation sites to abstract objects, one object per site.
#[derive(Clone, Debug, Default)]
pub struct HeapModel {
    objs: Vec<Obj>,
    alloc_sites: FxHashMap<Site, ObjId>,
}

impl HeapModel {
    pub fn new() -> HeapModel {
        HeapModel::default()
    }

    /// The object for an allocation site, interned on first use.
    pub fn obj_at(&mut self, site: Site, ty: &Type) -> ObjId {
        if let Some(&obj) = self.alloc_sites.get(&site) {
            return obj;
        }
        let obj = ObjId(self.objs.len());
        self.objs.push(Obj {
            kind: ObjKind::Alloc { site },
            ty: ty.clone(),
        });
        self.alloc_sites.insert(site, obj);
        obj
    }

    /// Mints an object that stands for no allocation site, e.g. a taint
    /// marker. The caller is responsible for interning.
    pub fn mock_obj(&mut self, kind: ObjKind, ty: Type) -> ObjId {
        let obj = ObjId(self.objs.len());
        self.objs.push(Obj { kind, ty });
        obj
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.index()]
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    pub fn is_taint(&self, id: ObjId) -> bool {
        self.obj(id).is_taint()
    }
}
