//! Checks one of the bundled sample programs against a policy and prints the report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example guideline_check -- b-then-a --policy astar-bstar
//! cargo run --example guideline_check -- endless-loop --k 2 --methods
//! ```
//!
//! With `--dot DIR`, the control flow graph of the entry method and the policy
//! automaton are written to `DIR` in Graphviz format.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use effects_rs::interproc::{AnalysisConfig, InterProcAnalysis};
use effects_rs::policies::{AStarBStar, AbcPolicy, BinaryPolicy, LoggedAccessPolicy};
use effects_rs::policy::Policy;
use effects_rs::report::Report;
use effects_rs::samples::{self, Sample};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SampleName {
    StraightLine,
    Recursion,
    EndlessLoop,
    CaughtException,
    SiblingOverrides,
    BThenA,
    AlternatingLoop,
    MockedLibrary,
    LoggedAccess,
    UnloggedAccess,
    TaintedOutput,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyName {
    Abc,
    AstarBstar,
    LoggedAccess,
    Binary,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Sample program to analyse.
    #[arg(value_enum)]
    sample: SampleName,

    /// Policy to check against. Defaults to the policy the sample is written for.
    #[clap(long, value_enum)]
    policy: Option<PolicyName>,

    /// Length of calling contexts.
    #[clap(long, value_name = "INT", default_value = "1")]
    k: usize,

    /// Bound on the passes of the finitary phase.
    #[clap(long, value_name = "INT", default_value = "40")]
    max_iterations: usize,

    /// Skip the counterexample search.
    #[clap(long)]
    no_counterexample: bool,

    /// List the types of all analysed methods.
    #[clap(long)]
    methods: bool,

    /// Write DOT files for the entry method and the policy automaton.
    #[clap(long, value_name = "DIR")]
    dot: Option<PathBuf>,
}

fn build_sample(name: SampleName) -> effects_rs::error::Result<(Sample, PolicyName)> {
    Ok(match name {
        SampleName::StraightLine => (samples::straight_line()?, PolicyName::Abc),
        SampleName::Recursion => (samples::recursion()?, PolicyName::Abc),
        SampleName::EndlessLoop => (samples::endless_loop()?, PolicyName::Abc),
        SampleName::CaughtException => (samples::caught_exception()?, PolicyName::Abc),
        SampleName::SiblingOverrides => (samples::sibling_overrides()?, PolicyName::Abc),
        SampleName::BThenA => (samples::b_then_a()?, PolicyName::AstarBstar),
        SampleName::AlternatingLoop => (samples::alternating_loop()?, PolicyName::AstarBstar),
        SampleName::MockedLibrary => (samples::mocked_library()?, PolicyName::Abc),
        SampleName::LoggedAccess => (samples::server_access(true)?, PolicyName::LoggedAccess),
        SampleName::UnloggedAccess => (samples::server_access(false)?, PolicyName::LoggedAccess),
        SampleName::TaintedOutput => (samples::tainted_output()?, PolicyName::Binary),
    })
}

fn build_policy(name: PolicyName) -> effects_rs::error::Result<Box<dyn Policy>> {
    Ok(match name {
        PolicyName::Abc => Box::new(AbcPolicy::new()?),
        PolicyName::AstarBstar => Box::new(AStarBStar::new()?),
        PolicyName::LoggedAccess => Box::new(LoggedAccessPolicy::new()?),
        PolicyName::Binary => Box::new(BinaryPolicy::new()?),
    })
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let (sample, default_policy) = build_sample(args.sample)?;
    let policy = build_policy(args.policy.unwrap_or(default_policy))?;
    println!("sample = {}, policy = {}", sample.name, policy.name());
    println!("domain = {:?}", policy.domain());

    if let Some(dir) = &args.dot {
        fs::create_dir_all(dir)?;
        if let Some(body) = sample.program.body(sample.entry) {
            let path = dir.join(format!("{}.dot", sample.name));
            fs::write(&path, body.to_dot()?)?;
            println!("Wrote {}", path.display());
        }
        let path = dir.join(format!("{}.dot", policy.name()));
        fs::write(&path, policy.domain().automaton().to_dot()?)?;
        println!("Wrote {}", path.display());
    }

    let config = AnalysisConfig {
        k: args.k,
        max_iterations: args.max_iterations,
        counterexamples: !args.no_counterexample,
    };
    let analysis = InterProcAnalysis::new(&sample.program, policy.as_ref(), sample.entry, config);
    let result = analysis.run()?;

    let mut report = Report::new(&result, analysis.context());
    report.show_methods = args.methods;
    println!();
    print!("{}", report);

    let (hits, misses) = policy.domain().cache_stats();
    println!();
    println!("intersection cache: {} hits, {} misses", hits, misses);
    println!("All done in {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
