//! Policies: the guideline being checked.
//!
//! A [`Policy`] owns the [`AbstractDomain`] of its automaton and decides two
//! things the analysis cannot infer on its own: which region a freshly created
//! object or string literal belongs to, and which library methods have a
//! hand-specified type and effect ([`Intrinsic`]).
//!
//! # Intrinsic constructors
//!
//! For an intrinsic constructor `void <init>(...)` the return type is read as
//! the new region of the receiver itself. This rebinding is only visible to the
//! caller of the constructor. If a subclass constructor calls an intrinsic
//! superclass constructor through `super(...)`, the region chosen by the
//! intrinsic is not propagated to the caller of the subclass constructor, so
//! field accesses made inside and outside that constructor may be attributed to
//! different regions. Only declare intrinsic constructors for classes whose
//! other constructors have no bodies.

use std::collections::HashMap;

use crate::calling_context::{CallingContext, Location};
use crate::domain::{AbstractDomain, Finitary};
use crate::monad::Monad;
use crate::program::{ClassId, MethodRef, Program};
use crate::region::Region;

/// Name of the class whose instances string literals are.
pub const STRING: &str = "String";

/// Hand-specified typing of a method.
pub trait Intrinsic {
    /// Refined return type of the method invoked on `region` with argument regions `args`.
    ///
    /// For constructors this is the refined type of the constructed object.
    fn return_type(&self, dom: &AbstractDomain, region: &Region, args: &[Region]) -> Monad<Region>;

    /// Refined type of the exceptions the method may throw.
    fn exceptional_type(&self, _dom: &AbstractDomain, _region: &Region, _args: &[Region]) -> Monad<Region> {
        Monad::empty()
    }
}

pub trait Policy {
    /// Short name used in reports.
    fn name(&self) -> &str;

    fn domain(&self) -> &AbstractDomain;

    /// Region of the object created by a `new` or `new array` expression.
    fn region_for_new(&self, ctx: &CallingContext, location: Location, class: Option<ClassId>) -> Region {
        Region::allocation(location, ctx.clone(), class)
    }

    /// Region of a string literal.
    fn region_for_string(&self, program: &Program, ctx: &CallingContext, location: Location) -> Region {
        Region::allocation(location, ctx.clone(), program.class_named(STRING))
    }

    /// The intrinsic typing of `method`, if it has one.
    fn intrinsic(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic>;
}

/// Intrinsics keyed by method signature, e.g. `<TaintAPI: void emitA()>`.
#[derive(Default)]
pub struct IntrinsicTable {
    entries: HashMap<String, Box<dyn Intrinsic>>,
}

impl IntrinsicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signature: &str, intrinsic: impl Intrinsic + 'static) {
        self.entries.insert(signature.to_string(), Box::new(intrinsic));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic> {
        self.entries
            .get(&program.signature(method))
            .map(|i| i.as_ref())
    }
}

/// A `void` method whose only behaviour is a fixed effect.
#[derive(Debug, Clone)]
pub struct Emit {
    effect: Finitary,
}

impl Emit {
    pub fn new(effect: Finitary) -> Self {
        Self { effect }
    }
}

impl Intrinsic for Emit {
    fn return_type(&self, dom: &AbstractDomain, _region: &Region, _args: &[Region]) -> Monad<Region> {
        Monad::pure(dom, Region::BaseType).then_effect(dom, &self.effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::policies::abc_automaton;
    use crate::program::{Origin, ProgramBuilder, Type};

    #[test]
    fn test_lookup_by_signature() {
        let dom = AbstractDomain::new(abc_automaton().unwrap()).unwrap();
        let a = dom.read_symbol("A").unwrap();

        let mut b = ProgramBuilder::new();
        let api = b.add_class("TaintAPI", Origin::Library);
        let emit_a = b.sig("emitA", vec![], Type::Void);
        let emit_b = b.sig("emitB", vec![], Type::Void);
        let m_a = b.add_method(api, emit_a, true);
        let m_b = b.add_method(api, emit_b, true);
        let program = b.build();

        let mut table = IntrinsicTable::new();
        table.insert("<TaintAPI: void emitA()>", Emit::new(a.clone()));
        assert_eq!(table.len(), 1);

        let intrinsic = table.lookup(&program, m_a).unwrap();
        let ret = intrinsic.return_type(&dom, &Region::Static, &[]);
        assert_eq!(ret, Monad::weighted(Region::BaseType, a));
        assert!(intrinsic.exceptional_type(&dom, &Region::Static, &[]).is_empty());
        assert!(table.lookup(&program, m_b).is_none());
    }
}
