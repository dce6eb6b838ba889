//! # CFG Builder
//!
//! Lowers a [`FunctionDecl`] body to a [`ControlFlowGraph`] whose entry
//! block holds the function's initial statements. Parameter declarations
//! are **not** emitted as assignments — they are live-in to entry and get
//! versioned by the SSA builder.
//!
//! Construction rules, one per AST shape, are implemented as private
//! `lower_*` methods below; see each for its specific block-splitting
//! behavior (if/while/for/for-in/try-catch-finally/switch/short-circuit
//! operators/await/throw).

use crate::ir::{BinaryOperator, BlockId, ControlFlowGraph, FunctionIr, Instruction, Value, Variable};
use crate::source_ast::{FunctionDecl, Stmt, SwitchCase};

/// Builds CFGs for every function/method in a parsed file.
///
/// Stateless across functions; holds only the fresh-offset counter for the
/// function currently being lowered.
#[derive(Default)]
pub struct CfgBuilder {
    next_offset: usize,
}

impl CfgBuilder {
    pub fn new() -> Self {
        CfgBuilder::default()
    }

    /// Lower one function. Returns `None` for an empty body: constructors
    /// and methods with empty bodies are silently skipped rather than
    /// producing a degenerate single-block CFG.
    pub fn build_function(&mut self, decl: &FunctionDecl) -> Option<FunctionIr> {
        if decl.body.is_empty() {
            return None;
        }
        self.next_offset = decl.start_offset;

        let mut cfg = ControlFlowGraph::new(decl.qualified_name.clone());
        let entry = cfg.add_block();
        cfg.entry = entry;

        let exit = self.lower_block(&mut cfg, entry, &decl.body);
        // A body that falls off the end without an explicit `return` gets
        // an implicit one so every path terminates.
        if let Some(tail) = exit {
            self.emit(&mut cfg, tail, |offset| Instruction::Return { value: None, offset });
        }

        Some(FunctionIr {
            qualified_name: decl.qualified_name.clone(),
            cfg,
            parameters: decl.parameters.clone(),
            source_file: decl.source_file.clone(),
            start_offset: decl.start_offset,
            end_offset: decl.end_offset,
        })
    }

    fn fresh_offset(&mut self) -> usize {
        let o = self.next_offset;
        self.next_offset += 1;
        o
    }

    fn emit(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, make: impl FnOnce(usize) -> Instruction) {
        let offset = self.fresh_offset();
        cfg.block_mut(block).instructions.push(make(offset));
    }

    /// Lower a statement list into `block`, returning the block that is
    /// still open for fallthrough (`None` if every path already
    /// terminated, e.g. ends in `return`/`throw`).
    fn lower_block(&mut self, cfg: &mut ControlFlowGraph, mut block: BlockId, stmts: &[Stmt]) -> Option<BlockId> {
        for stmt in stmts {
            match self.lower_stmt(cfg, block, stmt) {
                Some(next) => block = next,
                None => return None,
            }
        }
        Some(block)
    }

    fn lower_stmt(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, stmt: &Stmt) -> Option<BlockId> {
        match stmt {
            Stmt::Expr(value) => {
                self.lower_expr_for_effect(cfg, block, value);
                Some(block)
            }
            Stmt::Assign { target, value } => {
                let value = self.lower_rvalue(cfg, block, value);
                self.emit(cfg, block, |offset| Instruction::Assign {
                    target: Variable::unversioned(target.clone()),
                    value,
                    offset,
                });
                Some(block)
            }
            Stmt::If { cond, then_branch, else_branch } => self.lower_if(cfg, block, cond, then_branch, else_branch),
            Stmt::While { cond, body } => self.lower_while(cfg, block, cond, body),
            Stmt::DoWhile { body, cond } => self.lower_do_while(cfg, block, body, cond),
            Stmt::For { init, cond, step, body } => self.lower_for(cfg, block, init, cond, step, body),
            Stmt::ForIn { binding, iterable, body } => self.lower_for_in(cfg, block, binding, iterable, body),
            Stmt::TryCatchFinally { try_block, catch_blocks, finally_block } => {
                self.lower_try(cfg, block, try_block, catch_blocks, finally_block)
            }
            Stmt::Switch { scrutinee, cases } => self.lower_switch(cfg, block, scrutinee, cases),
            Stmt::Return(value) => {
                let value = value.as_ref().map(|v| self.lower_rvalue(cfg, block, v));
                self.emit(cfg, block, |offset| Instruction::Return { value, offset });
                None
            }
            Stmt::Throw(exception) => {
                let exception = self.lower_rvalue(cfg, block, exception);
                self.emit(cfg, block, |offset| Instruction::Throw { exception, offset });
                None
            }
            Stmt::Unmodeled => {
                // Unrecognized construct: emit a generic call marker rather
                // than aborting the build.
                self.emit(cfg, block, |offset| Instruction::Call {
                    receiver: None,
                    method: "<unmodeled>".to_string(),
                    args: vec![],
                    result: None,
                    offset,
                });
                Some(block)
            }
        }
    }

    /// `if (c) S else T`: three blocks (then/else/merge); `Branch`
    /// terminator in `block`; both arms fall through to merge via `Jump`.
    fn lower_if(
        &mut self,
        cfg: &mut ControlFlowGraph,
        block: BlockId,
        cond: &Value,
        then_branch: &[Stmt],
        else_branch: &[Stmt],
    ) -> Option<BlockId> {
        let cond = self.lower_rvalue(cfg, block, cond);
        let then_block = cfg.add_block();
        let else_block = cfg.add_block();
        self.emit(cfg, block, |offset| Instruction::Branch { cond, then_block, else_block, offset });
        cfg.add_edge(block, then_block);
        cfg.add_edge(block, else_block);

        let then_exit = self.lower_block(cfg, then_block, then_branch);
        let else_exit = self.lower_block(cfg, else_block, else_branch);

        match (then_exit, else_exit) {
            (None, None) => None,
            (Some(t), None) => Some(t),
            (None, Some(e)) => Some(e),
            (Some(t), Some(e)) => {
                let merge = cfg.add_block();
                self.emit(cfg, t, |offset| Instruction::Jump { target: merge, offset });
                cfg.add_edge(t, merge);
                self.emit(cfg, e, |offset| Instruction::Jump { target: merge, offset });
                cfg.add_edge(e, merge);
                Some(merge)
            }
        }
    }

    /// `while`: header block holds the condition; body block; exit block;
    /// back-edge from body to header.
    fn lower_while(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, cond: &Value, body: &[Stmt]) -> Option<BlockId> {
        let header = cfg.add_block();
        self.emit(cfg, block, |offset| Instruction::Jump { target: header, offset });
        cfg.add_edge(block, header);

        let body_block = cfg.add_block();
        let exit_block = cfg.add_block();
        let cond_value = self.lower_rvalue(cfg, header, cond);
        self.emit(cfg, header, |offset| Instruction::Branch {
            cond: cond_value,
            then_block: body_block,
            else_block: exit_block,
            offset,
        });
        cfg.add_edge(header, body_block);
        cfg.add_edge(header, exit_block);

        if let Some(body_exit) = self.lower_block(cfg, body_block, body) {
            self.emit(cfg, body_exit, |offset| Instruction::Jump { target: header, offset });
            cfg.add_edge(body_exit, header); // back-edge
        }

        Some(exit_block)
    }

    /// `do-while`: body runs at least once, then the header tests the
    /// condition; back-edge from header to body.
    fn lower_do_while(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, body: &[Stmt], cond: &Value) -> Option<BlockId> {
        let body_block = cfg.add_block();
        self.emit(cfg, block, |offset| Instruction::Jump { target: body_block, offset });
        cfg.add_edge(block, body_block);

        let header = cfg.add_block();
        let exit_block = cfg.add_block();

        if let Some(body_exit) = self.lower_block(cfg, body_block, body) {
            self.emit(cfg, body_exit, |offset| Instruction::Jump { target: header, offset });
            cfg.add_edge(body_exit, header);
        }

        let cond_value = self.lower_rvalue(cfg, header, cond);
        self.emit(cfg, header, |offset| Instruction::Branch {
            cond: cond_value,
            then_block: body_block,
            else_block: exit_block,
            offset,
        });
        cfg.add_edge(header, body_block); // back-edge
        cfg.add_edge(header, exit_block);

        Some(exit_block)
    }

    /// C-style `for`: `init` runs once in the preheader, header tests
    /// `cond`, body runs, `step` runs, back-edge to header.
    fn lower_for(
        &mut self,
        cfg: &mut ControlFlowGraph,
        block: BlockId,
        init: &Option<Box<Stmt>>,
        cond: &Value,
        step: &Option<Box<Stmt>>,
        body: &[Stmt],
    ) -> Option<BlockId> {
        let mut preheader_exit = Some(block);
        if let Some(init_stmt) = init {
            preheader_exit = preheader_exit.and_then(|b| self.lower_stmt(cfg, b, init_stmt));
        }
        let Some(preheader_exit) = preheader_exit else { return None };

        let header = cfg.add_block();
        self.emit(cfg, preheader_exit, |offset| Instruction::Jump { target: header, offset });
        cfg.add_edge(preheader_exit, header);

        let body_block = cfg.add_block();
        let exit_block = cfg.add_block();
        let cond_value = self.lower_rvalue(cfg, header, cond);
        self.emit(cfg, header, |offset| Instruction::Branch {
            cond: cond_value,
            then_block: body_block,
            else_block: exit_block,
            offset,
        });
        cfg.add_edge(header, body_block);
        cfg.add_edge(header, exit_block);

        let mut body_exit = self.lower_block(cfg, body_block, body);
        if let (Some(b), Some(step_stmt)) = (body_exit, step) {
            body_exit = self.lower_stmt(cfg, b, step_stmt);
        }
        if let Some(b) = body_exit {
            self.emit(cfg, b, |offset| Instruction::Jump { target: header, offset });
            cfg.add_edge(b, header); // back-edge
        }

        Some(exit_block)
    }

    /// `for-in`: header block holds the iterator step, treating the
    /// iterator advance as the header's "condition".
    fn lower_for_in(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, binding: &str, iterable: &Value, body: &[Stmt]) -> Option<BlockId> {
        let header = cfg.add_block();
        self.emit(cfg, block, |offset| Instruction::Jump { target: header, offset });
        cfg.add_edge(block, header);

        let body_block = cfg.add_block();
        let exit_block = cfg.add_block();
        let iterable_value = self.lower_rvalue(cfg, header, iterable);
        // Iterator step modeled as a call producing the loop-has-next flag
        // and binding the loop variable; the builder never aborts on the
        // exact surface iterator protocol.
        let has_next = Variable::unversioned(format!("{binding}$has_next"));
        self.emit(cfg, header, |offset| Instruction::Call {
            receiver: Some(iterable_value),
            method: "moveNext".to_string(),
            args: vec![],
            result: Some(has_next.clone()),
            offset,
        });
        self.emit(cfg, header, |offset| Instruction::Branch {
            cond: Value::VariableRef(has_next),
            then_block: body_block,
            else_block: exit_block,
            offset,
        });
        cfg.add_edge(header, body_block);
        cfg.add_edge(header, exit_block);

        if let Some(body_exit) = self.lower_block(cfg, body_block, body) {
            self.emit(cfg, body_exit, |offset| Instruction::Jump { target: header, offset });
            cfg.add_edge(body_exit, header);
        }

        Some(exit_block)
    }

    /// `try/catch/finally`: conservative normal-flow edges from every
    /// instruction's containing block to each catch-entry (we approximate
    /// this by wiring the try block itself to each catch-entry, since our
    /// try bodies are flat statement lists); a synthetic finally block is
    /// appended to every exit path.
    fn lower_try(
        &mut self,
        cfg: &mut ControlFlowGraph,
        block: BlockId,
        try_block: &[Stmt],
        catch_blocks: &[Vec<Stmt>],
        finally_block: &[Stmt],
    ) -> Option<BlockId> {
        let try_entry = cfg.add_block();
        self.emit(cfg, block, |offset| Instruction::Jump { target: try_entry, offset });
        cfg.add_edge(block, try_entry);

        let catch_entries: Vec<BlockId> = catch_blocks.iter().map(|_| cfg.add_block()).collect();
        // Conservative: every block of the try body may throw, so wire it
        // to each catch entry.
        for &catch_entry in &catch_entries {
            cfg.add_edge(try_entry, catch_entry);
        }

        let try_exit = self.lower_block(cfg, try_entry, try_block);
        let mut exits: Vec<BlockId> = try_exit.into_iter().collect();
        for (catch_entry, catch_body) in catch_entries.iter().zip(catch_blocks) {
            if let Some(exit) = self.lower_block(cfg, *catch_entry, catch_body) {
                exits.push(exit);
            }
        }

        if exits.is_empty() {
            return None;
        }

        let finally_entry = cfg.add_block();
        for exit in &exits {
            self.emit(cfg, *exit, |offset| Instruction::Jump { target: finally_entry, offset });
            cfg.add_edge(*exit, finally_entry);
        }

        self.lower_block(cfg, finally_entry, finally_block)
    }

    /// `switch`: one block per case; a fall-through case jumps to the next
    /// case's block instead of the merge block.
    fn lower_switch(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, scrutinee: &Value, cases: &[SwitchCase]) -> Option<BlockId> {
        let scrutinee_value = self.lower_rvalue(cfg, block, scrutinee);
        let case_blocks: Vec<BlockId> = cases.iter().map(|_| cfg.add_block()).collect();
        let merge = cfg.add_block();

        // One dispatch comparison per case, each wired as an edge from the
        // switch block to its case entry; the discriminant comparisons
        // themselves live in `block`.
        for (case, &case_block) in cases.iter().zip(&case_blocks) {
            let discriminant = case.value.clone().unwrap_or(Value::Constant(crate::ir::Literal::Null));
            let probe_result = Variable::unversioned(format!("$case_match_{case_block}"));
            self.emit(cfg, block, |offset| Instruction::Assign {
                target: probe_result,
                value: Value::BinaryOp {
                    op: BinaryOperator::Eq,
                    left: Box::new(scrutinee_value.clone()),
                    right: Box::new(discriminant),
                },
                offset,
            });
            cfg.add_edge(block, case_block);
        }
        cfg.add_edge(block, merge);

        for (i, (case, &case_block)) in cases.iter().zip(&case_blocks).enumerate() {
            let exit = self.lower_block(cfg, case_block, &case.body);
            match exit {
                Some(b) if case.falls_through && i + 1 < case_blocks.len() => {
                    let next = case_blocks[i + 1];
                    self.emit(cfg, b, |offset| Instruction::Jump { target: next, offset });
                    cfg.add_edge(b, next);
                }
                Some(b) => {
                    self.emit(cfg, b, |offset| Instruction::Jump { target: merge, offset });
                    cfg.add_edge(b, merge);
                }
                None => {}
            }
        }

        Some(merge)
    }

    /// Lower an rvalue expression, splitting short-circuit/null-aware
    /// operators into explicit branches so their condition count is
    /// visible to metrics and the fact extractor.
    fn lower_rvalue(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, value: &Value) -> Value {
        match value {
            Value::BinaryOp { op: BinaryOperator::And, left, right } => {
                self.lower_short_circuit(cfg, block, left, right, true)
            }
            Value::BinaryOp { op: BinaryOperator::Or, left, right } => {
                self.lower_short_circuit(cfg, block, left, right, false)
            }
            Value::BinaryOp { op, left, right } => Value::BinaryOp {
                op: *op,
                left: Box::new(self.lower_rvalue(cfg, block, left)),
                right: Box::new(self.lower_rvalue(cfg, block, right)),
            },
            Value::UnaryOp { op, operand } => {
                Value::UnaryOp { op: *op, operand: Box::new(self.lower_rvalue(cfg, block, operand)) }
            }
            Value::Call { receiver, method, args } => Value::Call {
                receiver: receiver.as_ref().map(|r| Box::new(self.lower_rvalue(cfg, block, r))),
                method: method.clone(),
                args: args.iter().map(|a| self.lower_rvalue(cfg, block, a)).collect(),
            },
            Value::FieldAccess { receiver, field } => {
                Value::FieldAccess { receiver: Box::new(self.lower_rvalue(cfg, block, receiver)), field: field.clone() }
            }
            Value::IndexAccess { receiver, index } => Value::IndexAccess {
                receiver: Box::new(self.lower_rvalue(cfg, block, receiver)),
                index: Box::new(self.lower_rvalue(cfg, block, index)),
            },
            Value::NewObject { ty, ctor, args } => Value::NewObject {
                ty: ty.clone(),
                ctor: ctor.clone(),
                args: args.iter().map(|a| self.lower_rvalue(cfg, block, a)).collect(),
            },
            other => other.clone(),
        }
    }

    /// `&&`/`||` lower to an explicit branch so the evaluated condition
    /// count matches what both the cyclomatic-complexity metric and the
    /// fact extractor expect to see. Correctness of the operand ordering
    /// matters more than block minimality here.
    fn lower_short_circuit(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, left: &Value, right: &Value, is_and: bool) -> Value {
        let left_value = self.lower_rvalue(cfg, block, left);
        let rhs_block = cfg.add_block();
        let merge = cfg.add_block();
        let (then_block, else_block) = if is_and { (rhs_block, merge) } else { (merge, rhs_block) };
        self.emit(cfg, block, |offset| Instruction::Branch {
            cond: left_value.clone(),
            then_block,
            else_block,
            offset,
        });
        cfg.add_edge(block, then_block);
        cfg.add_edge(block, else_block);

        let right_value = self.lower_rvalue(cfg, rhs_block, right);
        let result = Variable::unversioned(format!("$shortcircuit_{merge}"));
        self.emit(cfg, rhs_block, |offset| Instruction::Assign {
            target: result.clone(),
            value: right_value,
            offset,
        });
        self.emit(cfg, rhs_block, |offset| Instruction::Jump { target: merge, offset });
        cfg.add_edge(rhs_block, merge);

        Value::VariableRef(result)
    }

    /// An expression used purely for its side effect (e.g. a bare call, or
    /// `await e`). `await` does not split the block — suspension is
    /// modeled only at the fact-extractor level.
    fn lower_expr_for_effect(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, value: &Value) {
        match value {
            Value::Call { receiver, method, args } => {
                let receiver = receiver.as_ref().map(|r| self.lower_rvalue(cfg, block, r));
                let args = args.iter().map(|a| self.lower_rvalue(cfg, block, a)).collect();
                self.emit(cfg, block, |offset| Instruction::Call { receiver, method: method.clone(), args, result: None, offset });
            }
            other => {
                let value = self.lower_rvalue(cfg, block, other);
                let discard = Variable::unversioned("$discard");
                self.emit(cfg, block, |offset| Instruction::Assign { target: discard.clone(), value, offset });
            }
        }
    }

    /// `await e`: emits `Await(future, resultTemp)` without splitting the
    /// block.
    pub fn lower_await(&mut self, cfg: &mut ControlFlowGraph, block: BlockId, future: &Value) -> Variable {
        let future_value = self.lower_rvalue(cfg, block, future);
        let result = Variable::unversioned(format!("$await_{}", self.fresh_offset()));
        self.emit(cfg, block, |offset| Instruction::Await { future: future_value, result: result.clone(), offset });
        result
    }
}
