use crate::automaton::Automaton;
use crate::calling_context::{CallingContext, Location};
use crate::domain::AbstractDomain;
use crate::error::Result;
use crate::monad::Monad;
use crate::policy::{Intrinsic, IntrinsicTable, Policy, STRING};
use crate::program::{MethodRef, Program, OBJECT};
use crate::region::Region;

/// Untainted (`U`) and tainted (`T`) data. Only traces made of `U` are accepted.
pub fn binary_automaton() -> Result<Automaton> {
    let mut a = Automaton::new();
    a.add_symbol("U");
    a.add_symbol("T");
    a.add_state("U");
    a.add_state("T");
    a.add_edge("U", "U", "U")?;
    a.add_edge("U", "T", "T")?;
    a.add_edge("T", "T", "U")?;
    a.add_edge("T", "T", "T")?;
    a.set_initial("U")?;
    a.add_final("U")?;
    Ok(a)
}

/// String operations tracked by [`BinaryPolicy`]. Strings live in monoid
/// regions that record whether they carry tainted data.
#[derive(Debug, Clone, Copy)]
enum StringOp {
    /// A fresh string with the given class.
    Fresh(usize),
    /// The result is the first argument.
    CopyArg,
    /// The result is the receiver or the first argument.
    Concat,
    /// The result is the receiver.
    Preserve,
    /// Outputs the first argument, emitting its class.
    Output,
}

impl Intrinsic for StringOp {
    fn return_type(&self, dom: &AbstractDomain, region: &Region, args: &[Region]) -> Monad<Region> {
        match self {
            StringOp::Fresh(class) => Monad::pure(dom, Region::Monoid(*class)),
            StringOp::CopyArg => Monad::cases(dom, args.first().cloned()),
            StringOp::Concat => {
                Monad::cases(dom, std::iter::once(region.clone()).chain(args.first().cloned()))
            }
            StringOp::Preserve => Monad::pure(dom, region.clone()),
            StringOp::Output => {
                let effect = args
                    .first()
                    .and_then(|r| r.as_finitary(dom))
                    .unwrap_or_else(|| dom.one());
                Monad::pure(dom, Region::BaseType).then_effect(dom, &effect)
            }
        }
    }
}

/// Taint tracking: tainted strings must never reach `TaintAPI.outputString`.
pub struct BinaryPolicy {
    domain: AbstractDomain,
    intrinsics: IntrinsicTable,
    untainted: usize,
}

impl BinaryPolicy {
    pub fn new() -> Result<Self> {
        let domain = AbstractDomain::new(binary_automaton()?)?;
        let untainted = domain.read(domain.token("U")?);
        let tainted = domain.read(domain.token("T")?);

        let string = |sig: &str| format!("<{}: {}>", STRING, sig);
        let mut intrinsics = IntrinsicTable::new();
        intrinsics.insert(&string("void <init>()"), StringOp::Fresh(untainted));
        intrinsics.insert(&string("void <init>(String)"), StringOp::CopyArg);
        intrinsics.insert(&string("String concat(String)"), StringOp::Concat);
        intrinsics.insert(&string("String valueOf(String)"), StringOp::Concat);
        for sig in [
            "String replace(char,char)",
            "String substring(int)",
            "String substring(int,int)",
            "String toLowerCase()",
            "String toLowerCase(Locale)",
            "String toUpperCase()",
            "String toUpperCase(Locale)",
            "String toString()",
        ] {
            intrinsics.insert(&string(sig), StringOp::Preserve);
        }
        intrinsics.insert(&format!("<{}: String toString()>", OBJECT), StringOp::Preserve);

        let api = |sig: &str| format!("<{}: {}>", super::TAINT_API, sig);
        intrinsics.insert(&api("void outputString(String)"), StringOp::Output);
        intrinsics.insert(&api("String getTaintedString()"), StringOp::Fresh(tainted));

        Ok(Self {
            domain,
            intrinsics,
            untainted,
        })
    }
}

impl Policy for BinaryPolicy {
    fn name(&self) -> &str {
        "binary"
    }

    fn domain(&self) -> &AbstractDomain {
        &self.domain
    }

    /// Literals are untainted.
    fn region_for_string(&self, _program: &Program, _ctx: &CallingContext, _location: Location) -> Region {
        Region::Monoid(self.untainted)
    }

    fn intrinsic(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic> {
        self.intrinsics.lookup(program, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::program::{Origin, ProgramBuilder, Type};

    #[test]
    fn test_output_emits_argument_class() {
        let policy = BinaryPolicy::new().unwrap();
        let dom = policy.domain();
        let t = dom.read(dom.token("T").unwrap());

        let mut b = ProgramBuilder::new();
        let string = b.add_class(STRING, Origin::Library);
        let api = b.add_class(super::super::TAINT_API, Origin::Library);
        let output = b.sig("outputString", vec![Type::Ref(string)], Type::Void);
        let output = b.add_method(api, output, true);
        let program = b.build();

        let intrinsic = policy.intrinsic(&program, output).unwrap();
        let ret = intrinsic.return_type(dom, &Region::Static, &[Region::Monoid(t)]);
        assert!(!dom.accepted(&ret.aggregate()));
        let ret = intrinsic.return_type(dom, &Region::Static, &[Region::Unknown]);
        assert_eq!(ret, Monad::pure(dom, Region::BaseType));
    }

    #[test]
    fn test_concat_keeps_both_regions() {
        let policy = BinaryPolicy::new().unwrap();
        let dom = policy.domain();
        let u = Region::Monoid(policy.untainted);
        let t = Region::Monoid(dom.read(dom.token("T").unwrap()));
        let ret = StringOp::Concat.return_type(dom, &u, &[t.clone()]);
        assert_eq!(ret.len(), 2);
        assert!(ret.get(&t).is_some());
    }
}
