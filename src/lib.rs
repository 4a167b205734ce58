//! # effects-rs: Effect inference against temporal guidelines
//!
//! **`effects-rs`** checks whether every execution of a method follows a
//! *guideline*: a property of the sequence of security-relevant events the
//! program emits, given as a Büchi automaton. Terminating executions produce
//! finite words, diverging ones infinite words; both must be accepted.
//!
//! ## How it works
//!
//! Words are abstracted by their class in the **syntactic monoid** of the
//! automaton, so that a set of words becomes a bit set over finitely many
//! classes ([`Finitary`][crate::domain::Finitary]), and a set of infinite words
//! a bit set over linked pairs of classes ([`Infinitary`][crate::domain::Infinitary]).
//! All operations go through the [`AbstractDomain`][crate::domain::AbstractDomain]
//! manager, which owns the monoid, the acceptance sets and the memo tables.
//!
//! On top of the domain sits a type-and-effect analysis of an object-oriented
//! program in three-address form. Objects are abstracted by **regions**
//! (allocation sites under a bounded calling context), and every method is typed
//! per receiver region, argument regions and calling context. The terminating
//! behaviour is computed by an interprocedural fixpoint, the diverging
//! behaviour by solving linear equations over the domain.
//!
//! ## Quick Start
//!
//! ```rust
//! use effects_rs::domain::Render;
//! use effects_rs::interproc::{AnalysisConfig, InterProcAnalysis, Verdict};
//! use effects_rs::policies::AbcPolicy;
//! use effects_rs::policy::Policy;
//! use effects_rs::samples;
//!
//! // 1. A program: `Main.run()` emits A twice
//! let sample = samples::straight_line().unwrap();
//!
//! // 2. A policy: automaton, abstract domain and intrinsic methods
//! let policy = AbcPolicy::new().unwrap();
//!
//! // 3. Run the analysis from the entry method
//! let analysis = InterProcAnalysis::new(&sample.program, &policy, sample.entry, AnalysisConfig::default());
//! let result = analysis.run().unwrap();
//!
//! // 4. Inspect the verdict and the inferred effect
//! assert_eq!(result.verdict, Verdict::Accepted);
//! let dom = policy.domain();
//! assert_eq!(result.entry_effect().aggregate().render(dom), "{A·A}");
//! assert!(result.entry_infinitary().is_zero());
//! ```
//!
//! ## Core Components
//!
//! - **[`domain`]**: The [`AbstractDomain`][crate::domain::AbstractDomain] manager over the syntactic monoid of an [`automaton`].
//! - **[`program`]**, **[`cfg`]**: The program model and method bodies.
//! - **[`policy`]**, **[`policies`]**: Guidelines with their intrinsic methods.
//! - **[`interproc`]**: The driver, built from [`finitary`], [`infinitary`] and [`equations`].
//! - **[`counterexample`]**: Witness traces for rejected methods.
//! - **[`report`]**, **[`dot`]**: Text reports and Graphviz export.

pub mod automaton;
pub mod bitset;
pub mod cache;
pub mod calling_context;
pub mod cfg;
pub mod class_table;
pub mod context;
pub mod counterexample;
pub mod domain;
pub mod dot;
pub mod effect;
pub mod equations;
pub mod error;
pub mod finitary;
pub mod flow;
pub mod infinitary;
pub mod interproc;
pub mod mock;
pub mod monad;
pub mod monoid;
pub mod policies;
pub mod policy;
pub mod program;
pub mod region;
pub mod report;
pub mod samples;
pub mod tables;
pub mod term;
pub mod type_pool;
pub mod utils;
