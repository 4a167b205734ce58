//! The global typing state: method, field and array tables.
//!
//! # Well-formedness
//!
//! The method table is kept closed under overriding. Whenever an entry for
//! `C.m` is added, entries for `D.m` are added for every subclass or
//! implementer `D` of `C` in the [type pool](crate::type_pool::TypePool), with
//! the same calling context, receiver region and argument regions.
//!
//! Joins maintain the ordering between entries: an entry that dispatches to an
//! inherited body is at least the entry of the class declaring that body, and
//! an entry for `C.m` is at least every entry for a subclass of `C`. This is
//! what makes a call through a superclass type see the effects of every
//! override.
//!
//! # Defaults
//!
//! New entries start at a default determined by the [`MethodKind`] of the
//! method: bottom for methods whose body will be analysed, the hand-specified
//! typing for intrinsics, and "returns something unknown without effect" for
//! opaque library code.

use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use log::{debug, error, trace};

use crate::cfg::Body;
use crate::context::AnalysisContext;
use crate::effect::EffectType;
use crate::monad::Monad;
use crate::policy::{Intrinsic, Policy};
use crate::program::{ClassId, MethodRef, Program, Type};
use crate::region::Region;
use crate::tables::{ArrayKey, ArrayTable, FieldKey, FieldTable, MethodKey, MethodTable, Regions};
use crate::type_pool::TypePool;

/// How the typing of a method is obtained.
#[derive(Clone, Copy)]
pub enum MethodKind<'a> {
    /// Application method; its body is analysed.
    Application,
    /// Typing given by the policy.
    Intrinsic(&'a dyn Intrinsic),
    /// A constructor without a body; it does nothing.
    EmptyDefaultConstructor,
    /// Library method replaced by the body of a mock class.
    MockedLibrary,
    /// Library method whose body is not analysed.
    OpaqueLibrary,
}

impl<'a> MethodKind<'a> {
    pub fn of(ctx: &AnalysisContext<'a>, m: MethodRef) -> Self {
        let program = ctx.program;
        let policy: &'a dyn Policy = ctx.policy;
        if let Some(intrinsic) = policy.intrinsic(program, m) {
            return MethodKind::Intrinsic(intrinsic);
        }

        if !program.class(m.class).is_application() {
            let is_object_init = m.class == program.object()
                && program.is_constructor(m)
                && program.sig(m.sig).params.is_empty();
            if is_object_init {
                return MethodKind::EmptyDefaultConstructor;
            }
            let mocked = ctx.mocks.mock_method_ref(program, m);
            if mocked != m && ctx.body_of(m).is_some() {
                return MethodKind::MockedLibrary;
            }
            return MethodKind::OpaqueLibrary;
        }

        if program.is_constructor(m) && ctx.body_of(m).is_none() {
            return MethodKind::EmptyDefaultConstructor;
        }
        MethodKind::Application
    }

    /// Returns true if the body of the method (or of its mock) is analysed.
    pub fn has_body(&self) -> bool {
        matches!(self, MethodKind::Application | MethodKind::MockedLibrary)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MethodKind::Application => "application",
            MethodKind::Intrinsic(_) => "intrinsic",
            MethodKind::EmptyDefaultConstructor => "empty default constructor",
            MethodKind::MockedLibrary => "mocked library",
            MethodKind::OpaqueLibrary => "opaque library",
        }
    }
}

impl std::fmt::Debug for MethodKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    methods: MethodTable,
    fields: FieldTable,
    arrays: ArrayTable,
    type_pool: Rc<TypePool>,
}

impl ClassTable {
    pub fn new(type_pool: Rc<TypePool>) -> Self {
        Self {
            methods: MethodTable::new(),
            fields: FieldTable::new(),
            arrays: ArrayTable::new(),
            type_pool,
        }
    }

    pub fn type_pool(&self) -> &TypePool {
        &self.type_pool
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    pub fn arrays(&self) -> &ArrayTable {
        &self.arrays
    }

    pub fn keys(&self) -> Vec<MethodKey> {
        self.methods.keys().cloned().collect()
    }

    pub fn get(&self, key: &MethodKey) -> Option<&EffectType> {
        self.methods.get(key)
    }

    /// The body analysed for `key`, if the method has one.
    pub fn body<'a>(&self, ctx: &AnalysisContext<'a>, key: &MethodKey) -> Option<(MethodRef, &'a Body)> {
        if MethodKind::of(ctx, key.method).has_body() {
            ctx.body_of(key.method)
        } else {
            None
        }
    }

    /// Default entry of `key` before anything is known about it.
    pub fn default_effect(ctx: &AnalysisContext, key: &MethodKey) -> EffectType {
        let program = ctx.program;
        let dom = ctx.domain();
        if key.region.impossible(key.method, program) {
            return EffectType::bottom();
        }

        let unknown = || Self::unknown_effect(ctx, key);
        match MethodKind::of(ctx, key.method) {
            MethodKind::Intrinsic(intrinsic) => EffectType::new(
                intrinsic.return_type(dom, &key.region, &key.args),
                intrinsic.exceptional_type(dom, &key.region, &key.args),
            ),
            MethodKind::EmptyDefaultConstructor => {
                EffectType::new(Monad::pure(dom, Region::BaseType), Monad::empty())
            }
            MethodKind::OpaqueLibrary => unknown(),
            MethodKind::MockedLibrary => EffectType::bottom(),
            MethodKind::Application => {
                // The body alone determines the entry if the receiver is known.
                let known_receiver = key.method.is_static
                    || matches!(key.region, Region::Allocation(_) | Region::EntryPoint);
                if known_receiver {
                    EffectType::bottom()
                } else {
                    unknown()
                }
            }
        }
    }

    /// Returns something of the declared kind that is not tracked, without effect.
    fn unknown_effect(ctx: &AnalysisContext, key: &MethodKey) -> EffectType {
        let ret = if ctx.program.sig(key.method.sig).ret.is_reference() {
            Region::Unknown
        } else {
            Region::BaseType
        };
        EffectType::new(Monad::pure(ctx.domain(), ret), Monad::empty())
    }

    /// Adds an entry for `key`, its resolved declaration and all overrides in
    /// the type pool, keeping existing entries.
    pub fn ensure_present(&mut self, ctx: &AnalysisContext, key: &MethodKey) {
        if self.methods.contains_key(key) {
            return;
        }
        let program = ctx.program;

        let mut resolved = key.clone();
        let mut unresolved = false;
        if !matches!(MethodKind::of(ctx, key.method), MethodKind::OpaqueLibrary) {
            match program.resolve(key.method) {
                Some(m) => resolved = key.with_method(m),
                None => {
                    error!(
                        "cannot resolve {}, treating it as opaque",
                        program.signature(key.method)
                    );
                    unresolved = true;
                }
            }
        }

        let effect = match self.methods.get(&resolved) {
            Some(effect) => effect.clone(),
            None => {
                let effect = if unresolved && !key.region.impossible(key.method, program) {
                    Self::unknown_effect(ctx, &resolved)
                } else {
                    Self::default_effect(ctx, &resolved)
                };
                self.methods.insert(resolved.clone(), effect.clone());
                effect
            }
        };
        if resolved != *key {
            trace!("{} resolves to {}", key, resolved);
            self.methods.insert(key.clone(), effect);
        }

        if program.is_constructor(resolved.method) {
            return;
        }

        let class = resolved.method.class;
        let overriders = if program.class(class).is_interface {
            let mut all = program.implementers_of(class);
            all.extend(program.subinterfaces_of(class));
            all
        } else {
            program.all_subclasses(class)
        };
        for d in overriders {
            if !self.type_pool.contains(d) {
                continue;
            }
            let sub = resolved.with_method(resolved.method.with_class(d));
            if !self.methods.contains_key(&sub) {
                let effect = Self::default_effect(ctx, &sub);
                self.methods.insert(sub, effect);
            }
        }
    }

    /// Joins `effect` into the entry of `key`, if there is one, and into every
    /// entry that must stay above it.
    pub fn join_if_present(&mut self, program: &Program, key: &MethodKey, effect: &EffectType) {
        if let Some(entry) = self.methods.get_mut(key) {
            entry.join_assign(effect);
        }

        let m = key.method;
        let children = |c: ClassId| {
            if program.class(c).is_interface {
                program.direct_implementers(c)
            } else {
                program.direct_subclasses(c)
            }
        };

        // Subclasses inheriting the body.
        let mut queue = VecDeque::from(children(m.class));
        while let Some(d) = queue.pop_front() {
            if !self.type_pool.contains(d) || program.declares_method(d, m.sig) {
                continue;
            }
            self.join_at(key, d, effect);
            queue.extend(children(d));
        }

        // Superclasses and interfaces whose calls may dispatch here.
        let mut interfaces = VecDeque::new();
        let mut c = m.class;
        while !program.class(c).is_interface {
            let Some(sup) = program.class(c).superclass else {
                break;
            };
            interfaces.extend(program.class(c).interfaces.iter().copied());
            c = sup;
            self.join_at(key, c, effect);
        }
        interfaces.extend(program.class(c).interfaces.iter().copied());

        let mut visited = BTreeSet::new();
        while let Some(i) = interfaces.pop_front() {
            if !visited.insert(i) {
                continue;
            }
            self.join_at(key, i, effect);
            interfaces.extend(program.class(i).interfaces.iter().copied());
        }
    }

    fn join_at(&mut self, key: &MethodKey, class: ClassId, effect: &EffectType) {
        let at = key.with_method(key.method.with_class(class));
        if let Some(entry) = self.methods.get_mut(&at) {
            entry.join_assign(effect);
        }
    }

    /// Regions that may be stored in a field.
    ///
    /// Unwritten reference fields hold `null`, unless the owner is unknown.
    pub fn field(&self, program: &Program, key: &FieldKey) -> Regions {
        if let Some(regions) = self.fields.get(key) {
            return regions.clone();
        }
        let ty = &program.field(key.field).ty;
        Regions::from([Self::default_value(&key.region, ty)])
    }

    /// Records that `regions` may be stored in a field.
    pub fn store_field(&mut self, key: FieldKey, regions: Regions) {
        debug!("field store {:?}: {} regions", key.field, regions.len());
        self.fields.entry(key).or_default().extend(regions);
    }

    /// Regions that may be stored in the elements of an array with elements of type `elem`.
    pub fn array(&self, key: &ArrayKey, elem: &Type) -> Regions {
        if let Some(regions) = self.arrays.get(key) {
            return regions.clone();
        }
        Regions::from([Self::default_value(&key.region, elem)])
    }

    pub fn store_array(&mut self, key: ArrayKey, regions: Regions) {
        self.arrays.entry(key).or_default().extend(regions);
    }

    fn default_value(owner: &Region, ty: &Type) -> Region {
        if *owner == Region::Unknown {
            Region::Unknown
        } else if ty.is_reference() {
            Region::Null
        } else {
            Region::BaseType
        }
    }
}
