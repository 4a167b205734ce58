//! Read-only services shared by every stage of an analysis run.

use log::debug;

use crate::cfg::Body;
use crate::domain::AbstractDomain;
use crate::mock::MockTable;
use crate::policy::Policy;
use crate::program::{MethodRef, Program};

/// The program under analysis, the policy it is checked against, the mock
/// substitutions and the context depth `k`.
pub struct AnalysisContext<'a> {
    pub program: &'a Program,
    pub policy: &'a dyn Policy,
    pub mocks: MockTable,
    pub k: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(program: &'a Program, policy: &'a dyn Policy, k: usize) -> Self {
        Self {
            program,
            policy,
            mocks: MockTable::new(program),
            k,
        }
    }

    pub fn domain(&self) -> &'a AbstractDomain {
        self.policy.domain()
    }

    /// The body that is analysed for calls to `m`, together with the method it
    /// belongs to.
    ///
    /// Mock substitution is applied first. Only concrete methods declared by
    /// non-interface application classes have a body.
    pub fn body_of(&self, m: MethodRef) -> Option<(MethodRef, &'a Body)> {
        let target = self.mocks.mock_method_ref(self.program, m);
        if target != m {
            debug!(
                "using mocked method {} instead of {}",
                self.program.signature(target),
                self.program.signature(m)
            );
        }
        let class = self.program.class(target.class);
        if class.is_interface || !class.is_application() {
            return None;
        }
        self.program.body(target).map(|body| (target, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::cfg::BodyBuilder;
    use crate::policies::AbcPolicy;
    use crate::program::{Origin, ProgramBuilder, Type};

    fn trivial_body() -> Body {
        let mut b = BodyBuilder::new();
        b.ret(None);
        b.build().unwrap()
    }

    #[test]
    fn test_body_of() {
        let mut b = ProgramBuilder::new();
        let app = b.add_class("Main", Origin::Application);
        let lib = b.add_class("Socket", Origin::Library);
        let mock = b.add_class("DummySocket", Origin::Application);
        b.replaces(mock, "Socket").unwrap();
        let run = b.sig("run", vec![], Type::Void);
        let close = b.sig("close", vec![], Type::Void);
        let abstract_run = b.sig("idle", vec![], Type::Void);

        let main_run = b.add_method(app, run, false);
        b.set_body(main_run, trivial_body());
        let main_idle = b.add_method(app, abstract_run, false);
        let lib_close = b.add_method(lib, close, false);
        b.set_body(lib_close, trivial_body());
        let mock_close = b.add_method(mock, close, false);
        b.set_body(mock_close, trivial_body());
        let lib_run = b.add_method(lib, run, false);
        b.set_body(lib_run, trivial_body());
        let program = b.build();

        let policy = AbcPolicy::new().unwrap();
        let ctx = AnalysisContext::new(&program, &policy, 1);

        assert_eq!(ctx.body_of(main_run).map(|(m, _)| m), Some(main_run));
        assert!(ctx.body_of(main_idle).is_none());
        // Library bodies are replaced by the mock's.
        assert_eq!(ctx.body_of(lib_close).map(|(m, _)| m), Some(mock_close));
        // The mock does not declare run, and library bodies are never analysed.
        assert!(ctx.body_of(lib_run).is_none());
    }
}
