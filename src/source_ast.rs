//! Generic external AST contract.
//!
//! The parser is an external collaborator: this crate never embeds or wraps
//! one. These types are the minimal shape [`crate::cfg_builder`] needs from
//! *any* parsed, type-annotated AST for a typed OO language with nullable
//! references, async, and classes/mixins/extensions. A real front end
//! adapts its own tree to this enum; nothing downstream of the CFG builder
//! depends on a concrete parser crate.

use crate::ir::{Value, Variable};

/// One statement in a function/method/constructor body, or a nested block.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Value),
    Assign { target: String, value: Value },
    If { cond: Value, then_branch: Vec<Stmt>, else_branch: Vec<Stmt> },
    While { cond: Value, body: Vec<Stmt> },
    DoWhile { body: Vec<Stmt>, cond: Value },
    For { init: Option<Box<Stmt>>, cond: Value, step: Option<Box<Stmt>>, body: Vec<Stmt> },
    ForIn { binding: String, iterable: Value, body: Vec<Stmt> },
    TryCatchFinally { try_block: Vec<Stmt>, catch_blocks: Vec<Vec<Stmt>>, finally_block: Vec<Stmt> },
    Switch { scrutinee: Value, cases: Vec<SwitchCase> },
    Return(Option<Value>),
    Throw(Value),
    /// Any construct the builder doesn't model natively: lowered to a
    /// generic call rather than aborting the build.
    Unmodeled,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` marks the `default` case.
    pub value: Option<Value>,
    pub body: Vec<Stmt>,
    /// `true` when this case falls through to the next (no `break`).
    pub falls_through: bool,
}

/// A function/method/constructor declaration as seen by the CFG builder.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub qualified_name: String,
    pub parameters: Vec<Variable>,
    pub body: Vec<Stmt>,
    pub source_file: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// A class/mixin/extension/enum-with-methods declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub methods: Vec<FunctionDecl>,
    pub fields: Vec<String>,
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub functions: Vec<FunctionDecl>,
    pub classes: Vec<ClassDecl>,
}
