// SPDX-License-Identifier: AGPL-3.0

//! SWC-107 (Reentrancy) detector: state changed after a value-bearing
//! external call.
//!
//! Flags a `CALL`/`CALLCODE` with attacker-controlled gas and a non-zero
//! value, then separately checks whether storage is written after the call
//! returns on the same path. This module folds both checks into one flag on
//! the execution state: a value-bearing call marks the path, and any
//! `SSTORE`/`CREATE`/`CREATE2` reached afterwards
//! while that mark is still set is reported.
//!
//! `DELEGATECALL` and `STATICCALL` never carry a value argument (delegated
//! calls forward the caller's own balance movement, static calls forbid
//! any), so neither opcode is hooked here — there is nothing for this
//! detector to observe on either one.
//!
//! Severity is Medium when the callee address is symbolic (an
//! attacker-influenced destination makes the reentrant call target
//! unpredictable) and Low when it is a concrete, fixed address.

use crate::{DetectionModule, Issue, Severity};
use cbse_sevm::HookRegistry;
use std::cell::RefCell;
use std::rc::Rc;

const OP_CREATE: u8 = 0xf0;
const OP_CALL: u8 = 0xf1;
const OP_CALLCODE: u8 = 0xf2;
const OP_CREATE2: u8 = 0xf5;
const OP_SSTORE: u8 = 0x55;

const EXTERNAL_CALL_MARK: &str = "external_call_with_value_seen";

#[derive(Debug)]
struct ExternalCallFlag {
    call_pc: usize,
    callee_is_symbolic: bool,
}

/// Flags a storage write or contract creation that follows a value-bearing
/// `CALL` on the same execution path.
pub struct StateChangeAfterExternalCallDetector {
    issues: Rc<RefCell<Vec<Issue>>>,
}

impl StateChangeAfterExternalCallDetector {
    pub fn new() -> Self {
        Self {
            issues: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn report_state_change<'ctx>(
        sink: &'static str,
        issues: Rc<RefCell<Vec<Issue>>>,
    ) -> cbse_sevm::Hook<'ctx> {
        Box::new(move |state, _opcode, _ctx| {
            let marks = state.annotations.get::<ExternalCallFlag>(EXTERNAL_CALL_MARK);
            if let Some(mark) = marks.first() {
                let severity = if mark.callee_is_symbolic {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                let gas_used = 30_000_000u64.saturating_sub(state.gas);
                let issue = Issue::new(
                    state.address,
                    "SWC-107",
                    "Reentrancy",
                    severity,
                    format!(
                        "A {} executes after a value-bearing external call made at pc {}.",
                        sink, mark.call_pc
                    ),
                    "Sending value to an external address can transfer control to \
                     attacker-controlled code (a fallback function) before this call \
                     returns. If that code can call back into this contract before the \
                     state change below has happened, it observes stale state. Apply the \
                     checks-effects-interactions pattern: update storage before making the \
                     external call.",
                    gas_used,
                )
                .with_debug(state.path.to_string());
                issues.borrow_mut().push(issue);
            }
            Ok(())
        })
    }
}

impl Default for StateChangeAfterExternalCallDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ctx> DetectionModule<'ctx> for StateChangeAfterExternalCallDetector {
    fn register(&self, registry: &mut HookRegistry<'ctx>) {
        let mark_value_bearing_call: cbse_sevm::Hook<'ctx> = Box::new(|state, _opcode, ctx| {
            // Stack (top to bottom): gas, to, value, argsOffset,
            // argsLength, retOffset, retLength.
            if state.stack.len() < 3 {
                return Ok(());
            }
            let to = &state.stack[state.stack.len() - 2];
            let value = &state.stack[state.stack.len() - 3];
            if value.is_zero(ctx).is_true() {
                return Ok(());
            }
            let call_pc = state.pc;
            let callee_is_symbolic = to.is_symbolic();
            state.annotations.annotate(
                EXTERNAL_CALL_MARK,
                ExternalCallFlag {
                    call_pc,
                    callee_is_symbolic,
                },
            );
            Ok(())
        });
        registry.register_pre_hook(OP_CALL, mark_value_bearing_call);
        registry.register_pre_hook(
            OP_CALLCODE,
            Box::new(|state, _opcode, ctx| {
                if state.stack.len() < 3 {
                    return Ok(());
                }
                let to = &state.stack[state.stack.len() - 2];
                let value = &state.stack[state.stack.len() - 3];
                if value.is_zero(ctx).is_true() {
                    return Ok(());
                }
                let call_pc = state.pc;
                let callee_is_symbolic = to.is_symbolic();
                state.annotations.annotate(
                    EXTERNAL_CALL_MARK,
                    ExternalCallFlag {
                        call_pc,
                        callee_is_symbolic,
                    },
                );
                Ok(())
            }),
        );

        registry.register_pre_hook(
            OP_SSTORE,
            Self::report_state_change("storage write", Rc::clone(&self.issues)),
        );
        registry.register_pre_hook(
            OP_CREATE,
            Self::report_state_change("CREATE", Rc::clone(&self.issues)),
        );
        registry.register_pre_hook(
            OP_CREATE2,
            Self::report_state_change("CREATE2", Rc::clone(&self.issues)),
        );
    }

    fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    fn swc_id(&self) -> &'static str {
        "SWC-107"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbse_bitvec::CbseBitVec;
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

    fn push_call_with_value(state: &mut ExecState, value: u64) {
        // bottom -> top: retLength, retOffset, argsLength, argsOffset, value, to, gas
        state.stack.push(CbseBitVec::from_u64(0, 256)); // retLength
        state.stack.push(CbseBitVec::from_u64(0, 256)); // retOffset
        state.stack.push(CbseBitVec::from_u64(0, 256)); // argsLength
        state.stack.push(CbseBitVec::from_u64(0, 256)); // argsOffset
        state.stack.push(CbseBitVec::from_u64(value, 256)); // value
        state.stack.push(CbseBitVec::from_u64(0x1234, 256)); // to
        state.stack.push(CbseBitVec::from_u64(2300, 256)); // gas
    }

    #[test]
    fn sstore_after_value_bearing_call_is_flagged() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = StateChangeAfterExternalCallDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        push_call_with_value(&mut state, 100);
        registry.run_pre(OP_CALL, &mut state, &ctx).unwrap();

        state.stack.push(CbseBitVec::from_u64(7, 256)); // slot
        state.stack.push(CbseBitVec::from_u64(1, 256)); // value
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        let found = detector.issues();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].swc_id, "SWC-107");
    }

    #[test]
    fn symbolic_callee_is_flagged_medium_and_concrete_callee_low() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = StateChangeAfterExternalCallDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        state.stack.push(CbseBitVec::from_u64(0, 256)); // retLength
        state.stack.push(CbseBitVec::from_u64(0, 256)); // retOffset
        state.stack.push(CbseBitVec::from_u64(0, 256)); // argsLength
        state.stack.push(CbseBitVec::from_u64(0, 256)); // argsOffset
        state.stack.push(CbseBitVec::from_u64(100, 256)); // value
        state.stack.push(CbseBitVec::symbolic(&ctx, "to", 160)); // to (symbolic)
        state.stack.push(CbseBitVec::from_u64(2300, 256)); // gas
        registry.run_pre(OP_CALL, &mut state, &ctx).unwrap();

        state.stack.push(CbseBitVec::from_u64(7, 256));
        state.stack.push(CbseBitVec::from_u64(1, 256));
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        let found = detector.issues();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn callcode_with_value_is_also_flagged() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = StateChangeAfterExternalCallDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        push_call_with_value(&mut state, 100);
        registry.run_pre(OP_CALLCODE, &mut state, &ctx).unwrap();

        state.stack.push(CbseBitVec::from_u64(7, 256));
        state.stack.push(CbseBitVec::from_u64(1, 256));
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        let found = detector.issues();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn zero_value_call_does_not_flag_a_later_sstore() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = StateChangeAfterExternalCallDetector::new();
        detector.register(&mut registry);

        let mut state = fresh_state(&ctx);
        push_call_with_value(&mut state, 0);
        registry.run_pre(OP_CALL, &mut state, &ctx).unwrap();

        state.stack.push(CbseBitVec::from_u64(7, 256));
        state.stack.push(CbseBitVec::from_u64(1, 256));
        registry.run_pre(OP_SSTORE, &mut state, &ctx).unwrap();

        assert!(detector.issues().is_empty());
    }
}
