// SPDX-License-Identifier: AGPL-3.0

//! SWC-110 (Assertion Violation) detector.
//!
//! Solidity compiles a failed `assert()` to the `INVALID` (`0xFE`) opcode.
//! This detector is a pre-hook on that single opcode: reaching it at all is
//! the violation, so there is nothing to ask the solver beyond confirming
//! the path itself is feasible.

use crate::{DetectionModule, Issue, Severity};
use cbse_sevm::HookRegistry;
use std::cell::RefCell;
use std::rc::Rc;

const OP_INVALID: u8 = 0xfe;

/// Flags every reachable `INVALID` instruction as a failed `assert()`.
pub struct AssertionViolationDetector {
    issues: Rc<RefCell<Vec<Issue>>>,
}

impl AssertionViolationDetector {
    pub fn new() -> Self {
        Self {
            issues: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Default for AssertionViolationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ctx> DetectionModule<'ctx> for AssertionViolationDetector {
    fn register(&self, registry: &mut HookRegistry<'ctx>) {
        let issues = Rc::clone(&self.issues);

        registry.register_pre_hook(
            OP_INVALID,
            Box::new(move |state, _opcode, _ctx| {
                let gas_used = 30_000_000u64.saturating_sub(state.gas);
                let issue = Issue::new(
                    state.address,
                    "SWC-110",
                    "Assertion Violation",
                    Severity::Medium,
                    "A reachable `assert()` can fail on this contract.",
                    "`assert()` should only guard invariants that can never be violated by \
                     valid input. Reaching an INVALID instruction burns all remaining gas and \
                     reverts every state change; if this path is reachable from external input, \
                     consider `require()` instead.",
                    gas_used,
                )
                .with_debug(state.path.to_string());
                issues.borrow_mut().push(issue);
                Ok(())
            }),
        );
    }

    fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    fn swc_id(&self) -> &'static str {
        "SWC-110"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbse_sevm::ExecState;
    use cbse_traces::{CallContext, CallMessage, CallOutput};
    use std::rc::Rc as StdRc;

    fn state_at<'ctx>(ctx: &'ctx z3::Context, pc: usize) -> ExecState<'ctx> {
        let solver = StdRc::new(z3::Solver::new(ctx));
        let message = CallMessage::new(0, 0, 0, Vec::new(), 0xF1, false);
        let output = CallOutput::new(None, None, None);
        let call_context = CallContext::new(message, output, 0);
        let mut state = ExecState::new(ctx, call_context, solver);
        state.pc = pc;
        state
    }

    #[test]
    fn invalid_opcode_records_one_issue() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = AssertionViolationDetector::new();
        detector.register(&mut registry);

        let mut state = state_at(&ctx, 42);
        registry.run_pre(OP_INVALID, &mut state, &ctx).unwrap();

        let found = detector.issues();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].swc_id, "SWC-110");
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn other_opcodes_are_ignored() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();
        let detector = AssertionViolationDetector::new();
        detector.register(&mut registry);

        let mut state = state_at(&ctx, 0);
        registry.run_pre(0x01, &mut state, &ctx).unwrap();
        assert!(detector.issues().is_empty());
    }
}
