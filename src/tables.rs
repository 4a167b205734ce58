//! Keys and storage of the method, field and array tables.
//!
//! These are plain data: the well-formedness invariants (closure under
//! overriding, ordering between overridden entries) are maintained by
//! [`ClassTable`][crate::class_table::ClassTable].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::calling_context::CallingContext;
use crate::effect::EffectType;
use crate::program::{FieldId, MethodRef, Program};
use crate::region::Region;

/// A method invoked in a calling context on a receiver region with argument regions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub method: MethodRef,
    pub context: CallingContext,
    pub region: Region,
    pub args: Vec<Region>,
}

impl MethodKey {
    pub fn new(method: MethodRef, context: CallingContext, region: Region, args: Vec<Region>) -> Self {
        Self {
            method,
            context,
            region,
            args,
        }
    }

    /// The same invocation of another method, e.g. an override.
    pub fn with_method(&self, method: MethodRef) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }

    pub fn describe(&self, program: &Program) -> String {
        let args: Vec<String> = self.args.iter().map(|r| r.to_string()).collect();
        format!(
            "{} in region '{}', context {}, args [{}]",
            program.signature(self.method),
            self.region,
            self.context,
            args.join(", ")
        )
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|r| r.to_string()).collect();
        write!(
            f,
            "m{}.{}@{}{}({})",
            self.method.class.0,
            self.method.sig.0,
            self.region,
            self.context,
            args.join(", ")
        )
    }
}

/// A field of the objects of a region. Static fields live in [`Region::Static`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub region: Region,
    pub field: FieldId,
}

impl FieldKey {
    pub fn new(region: Region, field: FieldId) -> Self {
        Self { region, field }
    }
}

/// The elements of the arrays of a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayKey {
    pub region: Region,
}

impl ArrayKey {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

/// Regions of the values stored in a field or in array elements.
pub type Regions = BTreeSet<Region>;

pub type MethodTable = BTreeMap<MethodKey, EffectType>;
pub type FieldTable = BTreeMap<FieldKey, Regions>;
pub type ArrayTable = BTreeMap<ArrayKey, Regions>;
