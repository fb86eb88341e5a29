// SPDX-License-Identifier: AGPL-3.0

//! SWC-101 (Integer Overflow and Underflow) detector.
//!
//! Runs in two passes: an arithmetic pre-hook on `ADD`/`MUL`/`SUB` that asks
//! the solver whether the operation's no-overflow predicate can be
//! falsified on the current path, and a separate taint pass that only
//! reports an overflow if the tainted value is later used in a sensitive
//! sink (`SSTORE`, or a `JUMPI` condition) rather than discarded. The
//! arithmetic pre-hook annotates the *result* it is about to produce via
//! `AnnotationStore`, and the sink pre-hooks only fire if the value they are
//! about to consume carries that annotation.

use crate::{DetectionModule, Issue, Severity};
use cbse_bitvec::CbseBitVec;
use cbse_sevm::HookRegistry;
use std::cell::RefCell;
use std::rc::Rc;
use z3::SatResult;

const OP_ADD: u8 = 0x01;
const OP_MUL: u8 = 0x02;
const OP_SUB: u8 = 0x03;
const OP_SSTORE: u8 = 0x55;
const OP_JUMPI: u8 = 0x57;

#[derive(Debug)]
struct OverflowTaint {
    operation: &'static str,
}

/// Flags arithmetic that can overflow/underflow on the current path *and*
/// whose result reaches storage or a branch condition.
pub struct IntegerOverflowDetector {
    issues: Rc<RefCell<Vec<Issue>>>,
}

impl IntegerOverflowDetector {
    pub fn new() -> Self {
        Self {
            issues: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn tag_arithmetic<'ctx>(
        operation: &'static str,
        predicate: impl Fn(&CbseBitVec<'ctx>, &CbseBitVec<'ctx>, &'ctx z3::Context) -> cbse_bitvec::CbseBool<'ctx>
            + 'static,
    ) -> cbse_sevm::Hook<'ctx> {
        Box::new(move |state, _opcode, ctx| {
            if state.stack.len() < 2 {
                return Ok(());
            }
            let a = state.stack[state.stack.len() - 1].clone();
            let b = state.stack[state.stack.len() - 2].clone();

            let no_overflow = predicate(&a, &b, ctx);
            if no_overflow.is_true() {
                return Ok(());
            }
            let overflow_possible = if no_overflow.is_false() {
                true
            } else {
                let violatable = no_overflow.not(ctx).as_z3(ctx);
                state.path.check_feasibility(&violatable) == SatResult::Sat
            };

            if overflow_possible {
                let result = match operation {
                    "ADD" => a.add(&b, ctx),
                    "MUL" => a.mul(&b, ctx),
                    _ => a.sub(&b, ctx),
                };
                state
                    .annotations
                    .annotate(result.annotation_key(), OverflowTaint { operation });
            }
            Ok(())
        })
    }

    fn tag_sink<'ctx>(
        sink: &'static str,
        pop_index_from_top: usize,
        issues: Rc<RefCell<Vec<Issue>>>,
    ) -> cbse_sevm::Hook<'ctx> {
        Box::new(move |state, _opcode, _ctx| {
            if state.stack.len() <= pop_index_from_top {
                return Ok(());
            }
            let value = &state.stack[state.stack.len() - 1 - pop_index_from_top];
            let key = value.annotation_key();
            let tainted = state.annotations.get::<OverflowTaint>(&key);
            if let Some(taint) = tainted.first() {
                let gas_used = 30_000_000u64.saturating_sub(state.gas);
                let issue = Issue::new(
                    state.address,
                    "SWC-101",
                    "Integer Overflow and Underflow",
                    Severity::High,
                    format!(
                        "A {} that can overflow or underflow reaches {}.",
                        taint.operation, sink
                    ),
                    "Arithmetic in Solidity wraps on overflow unless it runs inside a \
                     `checked` block (or Solidity >= 0.8 without `unchecked`). The value \
                     computed here can wrap around to a surprising result before it is \
                     stored or used to decide control flow.",
                    gas_used,
                )
                .with_debug(state.path.to_string());
                issues.borrow_mut().push(issue);
            }
            Ok(())
        })
    }
}

impl Default for IntegerOverflowDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ctx> DetectionModule<'ctx> for IntegerOverflowDetector {
    fn register(&self, registry: &mut HookRegistry<'ctx>) {
        registry.register_pre_hook(
            OP_ADD,
            Self::tag_arithmetic("ADD", |a, b, ctx| a.bv_add_no_overflow(b, ctx)),
        );
        registry.register_pre_hook(
            OP_MUL,
            Self::tag_arithmetic("MUL", |a, b, ctx| a.bv_mul_no_overflow(b, ctx)),
        );
        registry.register_pre_hook(
            OP_SUB,
            Self::tag_arithmetic("SUB", |a, b, ctx| a.bv_sub_no_underflow(b, ctx)),
        );

        // SSTORE pops `slot` (top) then `value`; the stored value sits one
        // below the top at pre-hook time.
        registry.register_pre_hook(OP_SSTORE, Self::tag_sink("storage", 1, Rc::clone(&self.issues)));

        // JUMPI pops `dest` (top) then `cond`; same offset.
        registry.register_pre_hook(
            OP_JUMPI,
            Self::tag_sink("a branch condition", 1, Rc::clone(&self.issues)),
        );
    }

    fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    fn swc_id(&self) -> &'static str {
        "SWC-101"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbse_sevm::ExecState;
    use cbse_traces::{CallContext, CallMessage, CallOutput};
    use std::rc::Rc as StdRc;

    fn fresh_state<'ctx>(ctx: &'ctx z3::Context) -> ExecState<'ctx> {
        let solver = StdRc::new(z3::Solver::new(ctx));
        let message = CallMessage::new(0, 0, 0, Vec::new(), 0xF1, false);
        let output = CallOutput::new(None, None, None);
        let call_context = CallContext::new(message, output, 0);
        ExecState::new(ctx, call_context, solver)
    }

    #[test]
    fn concrete_add_that_overflows_and_reaches_storage_is_flagged() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = IntegerOverflowDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        let max = CbseBitVec::from_biguint(
            (num_bigint::BigUint::from(1u8) << 256usize) - num_bigint::BigUint::from(1u8),
            256,
        );
        let one = CbseBitVec::from_u64(1, 256);
        state.stack.push(one.clone());
        state.stack.push(max);
        registry.run_pre(OP_ADD, &mut state, &ctx).unwrap();

        // ADD's result (max + 1 wraps to 0) is now the value SSTORE would
        // store; push a slot on top of it to match SSTORE's stack shape.
        let result = state.stack.pop().unwrap();
        let _ = state.stack.pop();
        state.stack.push(result);
        state.stack.push(CbseBitVec::from_u64(7, 256)); // slot
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        let found = detector.issues();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].swc_id, "SWC-101");
    }

    #[test]
    fn addition_with_no_overflow_headroom_is_not_flagged() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = IntegerOverflowDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        state.stack.push(CbseBitVec::from_u64(2, 256));
        state.stack.push(CbseBitVec::from_u64(3, 256));
        registry.run_pre(OP_ADD, &mut state, &ctx).unwrap();

        let result = state.stack.pop().unwrap();
        let _ = state.stack.pop();
        state.stack.push(result);
        state.stack.push(CbseBitVec::from_u64(7, 256));
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        assert!(detector.issues().is_empty());
    }
}
