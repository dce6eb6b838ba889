//! # anteater
//!
//! A static analyzer for a typed object-oriented language: lowers source
//! ASTs to a control-flow graph, converts to SSA form, extracts Datalog
//! facts and runs a stratified points-to/taint/mutability/call-graph
//! analysis, and runs a worklist abstract interpreter over interval and
//! nullability lattices. Collaborator subsystems add code metrics,
//! technical-debt detection, style linting, an embedding cache, and a
//! parallel file walker.
//!
//! ## Pipeline
//!
//! ```text
//! SourceFile (external AST contract)
//!     ↓
//! [cfg_builder]       → ControlFlowGraph per function
//!     ↓
//! [ssa]                → SSA form (Braun et al. on-the-fly construction)
//!     ↓
//! [facts]              → Datalog facts (Alloc, Assign, Call, FieldStore, ...)
//!     ↓
//! [datalog]            → stratified fixed-point evaluation
//!     ↓
//! [absint]             → worklist abstract interpretation (intervals, nullability)
//! ```
//!
//! `project::ProjectAnalyzer` ties the pipeline together with the
//! collaborator subsystems (`metrics`, `debt`, `style`) and the parallel
//! file walker (`walker`) into one project-wide run; `report` renders the
//! result for the `cli` subcommands.

// Intermediate representation: CFG/SSA data model, the external AST
// contract the CFG builder lowers from, and the builder itself.
pub mod ir;
pub mod source_ast;
pub mod cfg_builder;
pub mod ssa;

// Fact extraction and the stratified Datalog engine.
pub mod facts;
pub mod datalog;

// Worklist abstract interpreter over interval/nullability lattices.
pub mod absint;

// Collaborator subsystems.
pub mod metrics;
pub mod debt;
pub mod style;
pub mod cache;
pub mod walker;

// Ambient stack: configuration, error types, orchestration, rendering, CLI.
pub mod config;
pub mod error;
pub mod project;
pub mod report;
pub mod cli;
pub mod server;

// Re-export the types most call sites reach for.
pub use crate::absint::Solver as AbstractInterpreter;
pub use crate::config::Config;
pub use crate::datalog::DatalogEngine;
pub use crate::error::{AnteaterError, Result};
pub use crate::facts::{Fact, FactExtractor};
pub use crate::ir::{BasicBlock, BlockId, ControlFlowGraph, FileIr, FunctionIr, Instruction, Value, Variable};
pub use crate::project::{ProjectAnalysisResult, ProjectAnalyzer};
