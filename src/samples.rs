//! Small sample programs exercising the analysis.
//!
//! Every sample has a static entry method `Main.run()`. The `TaintAPI`
//! samples call the emitting intrinsics `TaintAPI.emitA()`, `emitB()` and
//! `emitC()` of [`AbcPolicy`](crate::policies::AbcPolicy) and
//! [`AStarBStar`](crate::policies::AStarBStar).
//!
//! ```
//! use effects_rs::interproc::{AnalysisConfig, InterProcAnalysis, Verdict};
//! use effects_rs::policies::AStarBStar;
//! use effects_rs::samples;
//!
//! let sample = samples::b_then_a().unwrap();
//! let policy = AStarBStar::new().unwrap();
//! let analysis = InterProcAnalysis::new(&sample.program, &policy, sample.entry, AnalysisConfig::default());
//! assert_eq!(analysis.run().unwrap().verdict, Verdict::Rejected);
//! ```

use crate::cfg::{BodyBuilder, Expr, IdentityRef, InvokeExpr, Operand};
use crate::error::Result;
use crate::policies::{SERVER, TAINT_API};
use crate::policy::STRING;
use crate::program::{MethodRef, Origin, Prim, Program, ProgramBuilder, Type};

pub struct Sample {
    pub name: &'static str,
    pub program: Program,
    pub entry: MethodRef,
}

/// `TaintAPI.emitA()`, `emitB()` and `emitC()`.
fn taint_api(b: &mut ProgramBuilder) -> [MethodRef; 3] {
    let api = b.add_class(TAINT_API, Origin::Library);
    ["emitA", "emitB", "emitC"].map(|name| {
        let sig = b.sig(name, vec![], Type::Void);
        b.add_method(api, sig, true)
    })
}

/// Declares the static `Main.run()`.
fn main_run(b: &mut ProgramBuilder) -> MethodRef {
    let main = b.add_class("Main", Origin::Application);
    let run = b.sig("run", vec![], Type::Void);
    b.add_method(main, run, true)
}

fn call(body: &mut BodyBuilder, m: MethodRef) {
    body.invoke(InvokeExpr::static_call(m, vec![]));
}

/// Emits `A` twice and returns.
pub fn straight_line() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, _, _] = taint_api(&mut b);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    body.line(3);
    call(&mut body, emit_a);
    body.line(4);
    call(&mut body, emit_a);
    body.line(5);
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "straight-line",
        program: b.build(),
        entry: run,
    })
}

/// Emits `A` and calls itself, never returning.
pub fn recursion() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, _, _] = taint_api(&mut b);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    call(&mut body, emit_a);
    call(&mut body, run);
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "recursion",
        program: b.build(),
        entry: run,
    })
}

/// Emits `A`, then `B` and `C` in an endless loop.
pub fn endless_loop() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, emit_b, emit_c] = taint_api(&mut b);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    call(&mut body, emit_a);
    let head = body.here();
    call(&mut body, emit_b);
    call(&mut body, emit_c);
    body.goto(head);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "endless-loop",
        program: b.build(),
        entry: run,
    })
}

/// Calls `Main.fail()`, which always throws an `Error`, inside a `try` block
/// whose handler emits `B`. The `A` after the call is unreachable.
pub fn caught_exception() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, emit_b, _] = taint_api(&mut b);
    let error = b.add_class("Error", Origin::Library);
    let run = main_run(&mut b);
    let fail = b.sig("fail", vec![], Type::Void);
    let fail = b.add_method(run.class, fail, true);

    let mut body = BodyBuilder::new();
    let e = body.local("e", Type::Ref(error));
    body.assign_local(e, Expr::New(error));
    body.throw(e.into());
    b.set_body(fail, body.build()?);

    let mut body = BodyBuilder::new();
    let caught = body.local("caught", Type::Ref(error));
    let end = body.new_label();
    let begin = body.here();
    call(&mut body, fail);
    call(&mut body, emit_a);
    body.goto(end);
    let handler = body.here();
    body.identity(caught, IdentityRef::CaughtException);
    call(&mut body, emit_b);
    body.place(end);
    body.ret(None);
    body.trap(begin, handler, handler, error);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "caught-exception",
        program: b.build(),
        entry: run,
    })
}

/// `Left` and `Right` both override `Base.f()`, emitting `A` and `B`. The
/// receiver of the call is one or the other depending on a branch.
pub fn sibling_overrides() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, emit_b, _] = taint_api(&mut b);
    let base = b.add_class("Base", Origin::Application);
    let left = b.add_subclass("Left", Origin::Application, base);
    let right = b.add_subclass("Right", Origin::Application, base);
    let f = b.sig("f", vec![], Type::Void);
    let base_f = b.add_method(base, f, false);

    for (class, emit) in [(left, emit_a), (right, emit_b)] {
        let m = b.add_method(class, f, false);
        let mut body = BodyBuilder::new();
        let this = body.local("this", Type::Ref(class));
        body.identity(this, IdentityRef::This);
        call(&mut body, emit);
        body.ret(None);
        b.set_body(m, body.build()?);
    }

    let run = main_run(&mut b);
    let mut body = BodyBuilder::new();
    let x = body.local("x", Type::Ref(base));
    let other = body.new_label();
    let join = body.new_label();
    body.if_(Operand::int(0), other);
    body.assign_local(x, Expr::New(left));
    body.goto(join);
    body.place(other);
    body.assign_local(x, Expr::New(right));
    body.place(join);
    body.invoke(InvokeExpr::virtual_call(x, base_f, vec![]));
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "sibling-overrides",
        program: b.build(),
        entry: run,
    })
}

/// Emits `B`, then `A`. Rejected by `a*b*`.
pub fn b_then_a() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, emit_b, _] = taint_api(&mut b);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    body.line(3);
    call(&mut body, emit_b);
    body.line(4);
    call(&mut body, emit_a);
    body.line(5);
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "b-then-a",
        program: b.build(),
        entry: run,
    })
}

/// Emits `A` and `B` alternately forever. Rejected by `a*b*`.
pub fn alternating_loop() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [emit_a, emit_b, _] = taint_api(&mut b);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    let head = body.here();
    call(&mut body, emit_a);
    call(&mut body, emit_b);
    body.goto(head);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "alternating-loop",
        program: b.build(),
        entry: run,
    })
}

/// Calls the library method `Logger.write()`, which is replaced by the
/// application class `MockLogger` whose `write()` emits `C`.
pub fn mocked_library() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let [_, _, emit_c] = taint_api(&mut b);
    let logger = b.add_class("Logger", Origin::Library);
    let mock = b.add_class("MockLogger", Origin::Application);
    b.replaces(mock, "Logger")?;
    let write = b.sig("write", vec![], Type::Void);
    let logger_write = b.add_method(logger, write, true);
    let mock_write = b.add_method(mock, write, true);

    let mut body = BodyBuilder::new();
    call(&mut body, emit_c);
    body.ret(None);
    b.set_body(mock_write, body.build()?);

    let run = main_run(&mut b);
    let mut body = BodyBuilder::new();
    call(&mut body, logger_write);
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "mocked-library",
        program: b.build(),
        entry: run,
    })
}

/// Reads sensitive data after a successful authorization and, if `logged`,
/// logs the access.
/// Checked with [`LoggedAccessPolicy`](crate::policies::LoggedAccessPolicy).
pub fn server_access(logged: bool) -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let server = b.add_class(SERVER, Origin::Library);
    let [auth, access, log] = [
        ("verifyAuthorization", Type::Prim(Prim::Boolean)),
        ("readSensitiveData", Type::Void),
        ("logAccess", Type::Void),
    ]
    .map(|(name, ret)| {
        let sig = b.sig(name, vec![], ret);
        b.add_method(server, sig, true)
    });
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    let ok = body.local("ok", Type::Prim(Prim::Boolean));
    let done = body.new_label();
    body.assign_local(ok, Expr::Invoke(InvokeExpr::static_call(auth, vec![])));
    body.if_(ok.into(), done);
    call(&mut body, access);
    if logged {
        call(&mut body, log);
    }
    body.place(done);
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: if logged { "logged-access" } else { "unlogged-access" },
        program: b.build(),
        entry: run,
    })
}

/// Passes the result of `TaintAPI.getTaintedString()` to
/// `TaintAPI.outputString(String)`. Checked with the binary taint policy.
pub fn tainted_output() -> Result<Sample> {
    let mut b = ProgramBuilder::new();
    let string = b.add_class(STRING, Origin::Library);
    let api = b.add_class(TAINT_API, Origin::Library);
    let get = b.sig("getTaintedString", vec![], Type::Ref(string));
    let get = b.add_method(api, get, true);
    let output = b.sig("outputString", vec![Type::Ref(string)], Type::Void);
    let output = b.add_method(api, output, true);
    let run = main_run(&mut b);

    let mut body = BodyBuilder::new();
    let s = body.local("s", Type::Ref(string));
    body.assign_local(s, Expr::Invoke(InvokeExpr::static_call(get, vec![])));
    body.invoke(InvokeExpr::static_call(output, vec![s.into()]));
    body.ret(None);
    b.set_body(run, body.build()?);

    Ok(Sample {
        name: "tainted-output",
        program: b.build(),
        entry: run,
    })
}

