//! Contexts and context selectors for the context-sensitive pointer
//! analysis.
//!
//! A context is a k-limited sequence of context elements: call sites for
//! call-site sensitivity, receiver objects for object sensitivity. The
//! most recent element is last; pushing past the limit drops the oldest.

use serde::Serialize;
use std::fmt;

use crate::analysis::pta::ObjId;
use crate::ir::{MethodId, Site};

/// One element of a context.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ContextElem {
    CallSite(Site),
    HeapObj(ObjId),
}

/// A calling or heap context.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Context {
    elems: Vec<ContextElem>,
}

impl Context {
    pub fn empty() -> Context {
        Context::default()
    }

    pub fn depth(&self) -> usize {
        self.elems.len()
    }

    pub fn elems(&self) -> &[ContextElem] {
        &self.elems
    }

    /// This context with `elem` appended, keeping at most the `k` most
    /// recent elements.
    pub fn pushed(&self, elem: ContextElem, k: usize) -> Context {
        let mut elems = self.elems.clone();
        elems.push(elem);
        while elems.len() > k {
            elems.remove(0);
        }
        Context { elems }
    }

    /// This context truncated to its `k` most recent elements.
    pub fn truncated(&self, k: usize) -> Context {
        let skip = self.elems.len().saturating_sub(k);
        Context {
            elems: self.elems[skip..].to_vec(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, elem) in self.elems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match elem {
                ContextElem::CallSite(site) => write!(f, "{}", site)?,
                ContextElem::HeapObj(obj) => write!(f, "{}", obj)?,
            }
        }
        write!(f, "]")
    }
}

/// Chooses contexts for callees and heap objects.
pub trait ContextSelector {
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    /// The context for a static callee.
    fn select_static_context(&self, caller: &Context, site: Site, callee: MethodId) -> Context;

    /// The context for an instance callee, given the receiver object and
    /// its heap context.
    fn select_instance_context(
        &self,
        caller: &Context,
        site: Site,
        recv_ctx: &Context,
        recv: ObjId,
        callee: MethodId,
    ) -> Context;

    /// The heap context for an object allocated in a method running under
    /// `method_ctx`.
    fn select_heap_context(&self, method_ctx: &Context, method: MethodId, obj: ObjId) -> Context;
}

/// k-call-site sensitivity (k-CFA). Heap contexts keep k - 1 elements.
#[derive(Clone, Copy, Debug)]
pub struct KCallSiteSelector {
    pub k: usize,
}

impl KCallSiteSelector {
    pub fn new(k: usize) -> KCallSiteSelector {
        KCallSiteSelector { k }
    }
}

impl ContextSelector for KCallSiteSelector {
    fn select_static_context(&self, caller: &Context, site: Site, _callee: MethodId) -> Context {
        caller.pushed(ContextElem::CallSite(site), self.k)
    }

    fn select_instance_context(
        &self,
        caller: &Context,
        site: Site,
        _recv_ctx: &Context,
        _recv: ObjId,
        _callee: MethodId,
    ) -> Context {
        caller.pushed(ContextElem::CallSite(site), self.k)
    }

    fn select_heap_context(&self, method_ctx: &Context, _method: MethodId, _obj: ObjId) -> Context {
        method_ctx.truncated(self.k.saturating_sub(1))
    }
}

/// k-object sensitivity. Static calls inherit the caller's context; heap
/// contexts keep k - 1 elements.
#[derive(Clone, Copy, Debug)]
pub struct KObjectSelector {
    pub k: usize,
}

impl KObjectSelector {
    pub fn new(k: usize) -> KObjectSelector {
        KObjectSelector { k }
    }
}

impl ContextSelector for KObjectSelector {
    fn select_static_context(&self, caller: &Context, _site: Site, _callee: MethodId) -> Context {
        caller.clone()
    }

    fn select_instance_context(
        &self,
        _caller: &Context,
        _site: Site,
        recv_ctx: &Context,
        recv: ObjId,
        _callee: MethodId,
    ) -> Context {
        recv_ctx.pushed(ContextElem::HeapObj(recv), self.k)
    }

    fn select_heap_context(&self, method_ctx: &Context, _method: MethodId, _obj: ObjId) -> Context {
        method_ctx.truncated(self.k.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_limiting_drops_oldest() {
        let s0 = Site::new(MethodId(0), 0);
        let s1 = Site::new(MethodId(0), 1);
        let s2 = Site::new(MethodId(0), 2);

        let ctx = Context::empty()
            .pushed(ContextElem::CallSite(s0), 2)
            .pushed(ContextElem::CallSite(s1), 2)
            .pushed(ContextElem::CallSite(s2), 2);
        assert_eq!(
            ctx.elems(),
            [ContextElem::CallSite(s1), ContextElem::CallSite(s2)]
        );

        assert_eq!(ctx.truncated(1).elems(), [ContextElem::CallSite(s2)]);
        assert_eq!(ctx.truncated(0).depth(), 0);
    }
}
