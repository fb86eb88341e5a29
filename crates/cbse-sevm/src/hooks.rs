// SPDX-License-Identifier: AGPL-3.0

//! Opcode hook dispatch for detection modules.
//!
//! A detection module registers pre- and post-execution callbacks for
//! specific opcodes (`register_pre_hook`/`register_post_hook`); the engine
//! invokes them from the main loop around each instruction. A module never
//! enqueues work itself; it only observes a fully-formed `ExecState` and may
//! annotate it or record an issue. `HookRegistry` stores hooks by opcode,
//! runs them in registration order, and keeps them as plain closures so a
//! detection module can close over its own issue list.

use crate::ExecState;
use cbse_exceptions::CbseResult;
use std::collections::HashMap;
use z3::Context;

/// A callback invoked immediately before (`pre`) or after (`post`) the
/// instruction at `opcode` executes on `state`. Takes the Z3 context
/// alongside the state since most detection logic needs it to build or
/// query SMT terms, and `ExecState` has no back-reference to it.
pub type Hook<'ctx> = Box<dyn Fn(&mut ExecState<'ctx>, u8, &'ctx Context) -> CbseResult<()>>;

/// Opcode-keyed pre/post hook tables, run by the engine's main loop.
///
/// Hooks may not enqueue work directly — they only get a `&mut ExecState` to
/// annotate, never a handle back into the worklist or CFG.
#[derive(Default)]
pub struct HookRegistry<'ctx> {
    pre: HashMap<u8, Vec<Hook<'ctx>>>,
    post: HashMap<u8, Vec<Hook<'ctx>>>,
}

impl<'ctx> HookRegistry<'ctx> {
    pub fn new() -> Self {
        Self {
            pre: HashMap::new(),
            post: HashMap::new(),
        }
    }

    /// Register a callback to run before `opcode` executes, for every state
    /// about to execute it. Appended to the end of that opcode's list, so
    /// hooks fire in registration order.
    pub fn register_pre_hook(&mut self, opcode: u8, hook: Hook<'ctx>) {
        self.pre.entry(opcode).or_default().push(hook);
    }

    /// Register a callback to run on each successor produced by `opcode`.
    pub fn register_post_hook(&mut self, opcode: u8, hook: Hook<'ctx>) {
        self.post.entry(opcode).or_default().push(hook);
    }

    pub fn run_pre(&self, opcode: u8, state: &mut ExecState<'ctx>, ctx: &'ctx Context) -> CbseResult<()> {
        if let Some(hooks) = self.pre.get(&opcode) {
            for hook in hooks {
                hook(state, opcode, ctx)?;
            }
        }
        Ok(())
    }

    pub fn run_post(&self, opcode: u8, state: &mut ExecState<'ctx>, ctx: &'ctx Context) -> CbseResult<()> {
        if let Some(hooks) = self.post.get(&opcode) {
            for hook in hooks {
                hook(state, opcode, ctx)?;
            }
        }
        Ok(())
    }

    pub fn has_pre_hooks(&self, opcode: u8) -> bool {
        self.pre.get(&opcode).is_some_and(|v| !v.is_empty())
    }

    pub fn has_post_hooks(&self, opcode: u8) -> bool {
        self.post.get(&opcode).is_some_and(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbse_traces::{CallContext, CallMessage, CallOutput};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn dummy_state(ctx: &z3::Context) -> ExecState<'_> {
        let solver = Rc::new(z3::Solver::new(ctx));
        let message = CallMessage::new(0, 0, 0, Vec::new(), 0xF1, false);
        let output = CallOutput::new(None, None, None);
        let call_context = CallContext::new(message, output, 0);
        ExecState::new(ctx, call_context, solver)
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut registry: HookRegistry = HookRegistry::new();

        let order = Rc::new(RefCell::new(Vec::new()));
        let order_a = Rc::clone(&order);
        let order_b = Rc::clone(&order);

        registry.register_pre_hook(
            0x01,
            Box::new(move |_state, _op, _ctx| {
                order_a.borrow_mut().push("a");
                Ok(())
            }),
        );
        registry.register_pre_hook(
            0x01,
            Box::new(move |_state, _op, _ctx| {
                order_b.borrow_mut().push("b");
                Ok(())
            }),
        );

        let mut state = dummy_state(&ctx);
        registry.run_pre(0x01, &mut state, &ctx).unwrap();

        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn unregistered_opcode_is_a_noop() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let registry: HookRegistry = HookRegistry::new();
        let mut state = dummy_state(&ctx);
        assert!(registry.run_pre(0x01, &mut state, &ctx).is_ok());
        assert!(!registry.has_pre_hooks(0x01));
    }
}
