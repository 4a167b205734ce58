//! Regions: abstract identities of runtime values.
//!
//! A region names an equivalence class of runtime objects. Objects are grouped by
//! allocation site and calling context. Values that are not objects, or whose
//! origin is not tracked, fall into one of the sentinel regions.

use std::fmt;
use std::rc::Rc;

use crate::calling_context::{CallingContext, Location};
use crate::domain::{AbstractDomain, Finitary};
use crate::program::{ClassId, MethodRef, Program};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationSite {
    pub location: Location,
    pub context: CallingContext,
    /// Class of the allocated object, if it is a class instance.
    pub class: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    /// Objects created at one site in one calling context.
    Allocation(Rc<AllocationSite>),
    /// The value passed as the given parameter of the entry method.
    Input(usize),
    /// An exception of a known class, e.g. declared by an intrinsic.
    ExceptionClass(ClassId),
    /// A value carrying a monoid class, e.g. a string tagged by a taint policy.
    Monoid(usize),
    /// Values returned by opaque library code.
    Unknown,
    /// Receiver of the entry method.
    EntryPoint,
    /// Exceptions of unknown class.
    Exception,
    /// Receiver of static methods and owner of static fields.
    Static,
    /// All primitive values.
    BaseType,
    Null,
}

impl Region {
    pub fn allocation(location: Location, context: CallingContext, class: Option<ClassId>) -> Self {
        Region::Allocation(Rc::new(AllocationSite {
            location,
            context,
            class,
        }))
    }

    /// Returns true if no object of this region can execute `m` as its receiver.
    ///
    /// `null` never executes anything. An allocation region of a known class can
    /// only execute a non-static, non-constructor method that its class actually
    /// dispatches to. All other regions may execute any method.
    pub fn impossible(&self, m: MethodRef, program: &Program) -> bool {
        match self {
            Region::Null => true,
            Region::Allocation(site) => {
                let Some(class) = site.class else {
                    return false;
                };
                // Constructors of superclasses run on the object too.
                if program.is_constructor(m) || m.is_static {
                    return false;
                }
                if program.is_subclass(class, m.class) {
                    if let Some(dispatched) = program.resolve(m.with_class(class)) {
                        return dispatched.class != m.class;
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// The effect carried by a monoid region.
    pub fn as_finitary(&self, dom: &AbstractDomain) -> Option<Finitary> {
        match self {
            Region::Monoid(x) => Some(dom.make(&[*x])),
            _ => None,
        }
    }

    pub fn describe(&self, program: &Program, dom: &AbstractDomain) -> String {
        match self {
            Region::Allocation(site) => {
                let ctx = site.context.describe(program);
                if ctx.is_empty() {
                    format!("<created at {}>", site.location.describe(program))
                } else {
                    format!("<created at {} {}>", site.location.describe(program), ctx)
                }
            }
            Region::ExceptionClass(c) => program.class(*c).name.clone(),
            Region::Monoid(x) => dom.class_to_string(*x),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Allocation(site) => write!(
                f,
                "<created at {}:{} {}>",
                site.location.method.sig.0, site.location.stmt, site.context
            ),
            Region::Input(i) => write!(f, "input{}", i),
            Region::ExceptionClass(c) => write!(f, "exception#{}", c.0),
            Region::Monoid(x) => write!(f, "monoid#{}", x),
            Region::Unknown => f.write_str("unknown"),
            Region::EntryPoint => f.write_str("entry_point"),
            Region::Exception => f.write_str("exception"),
            Region::Static => f.write_str("static"),
            Region::BaseType => f.write_str("base"),
            Region::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::cfg::StmtId;
    use crate::program::{Origin, ProgramBuilder, Type, CONSTRUCTOR};

    #[test]
    fn test_impossible() {
        let mut b = ProgramBuilder::new();
        let a = b.add_class("A", Origin::Application);
        let bb = b.add_subclass("B", Origin::Application, a);
        let c = b.add_subclass("C", Origin::Application, a);
        let f = b.sig("f", vec![], Type::Void);
        let g = b.sig("g", vec![], Type::Void);
        let init = b.sig(CONSTRUCTOR, vec![], Type::Void);
        let a_f = b.add_method(a, f, false);
        let b_f = b.add_method(bb, f, false);
        let a_g = b.add_method(a, g, false);
        let a_init = b.add_method(a, init, false);
        let program = b.build();

        let loc = Location::new(a_f, StmtId(0));
        let region_of = |class| Region::allocation(loc, CallingContext::empty(1), Some(class));

        // B overrides f, so A.f never runs on a B.
        assert!(region_of(bb).impossible(a_f, &program));
        assert!(!region_of(bb).impossible(b_f, &program));
        // C inherits f from A.
        assert!(!region_of(c).impossible(a_f, &program));
        // B inherits g.
        assert!(!region_of(bb).impossible(a_g, &program));
        // An A is not a B.
        assert!(region_of(a).impossible(b_f, &program));
        // Superclass constructors run on subclass instances.
        assert!(!region_of(bb).impossible(a_init, &program));

        assert!(Region::Null.impossible(a_f, &program));
        assert!(!Region::Unknown.impossible(a_f, &program));
        assert!(!Region::allocation(loc, CallingContext::empty(1), None).impossible(b_f, &program));
    }

    #[test]
    fn test_sentinel_names() {
        assert_eq!(Region::Unknown.to_string(), "unknown");
        assert_eq!(Region::EntryPoint.to_string(), "entry_point");
        assert_eq!(Region::Exception.to_string(), "exception");
        assert_eq!(Region::Static.to_string(), "static");
        assert_eq!(Region::BaseType.to_string(), "base");
        assert_eq!(Region::Null.to_string(), "null");
    }
}
