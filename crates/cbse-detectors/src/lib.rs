// SPDX-License-Identifier: AGPL-3.0

//! Detection modules for the symbolic execution engine.
//!
//! Each module is a self-contained unit that registers pre/post hooks
//! against a `HookRegistry` and records `Issue`s as the hooked opcodes
//! execute. Every module closes over its own findings list and only
//! observes state through the hook callbacks it registered — no shared
//! process-wide registry.

mod assertion_violation;
mod external_call_state_change;
mod integer_overflow;
mod issue;

pub use assertion_violation::AssertionViolationDetector;
pub use external_call_state_change::StateChangeAfterExternalCallDetector;
pub use integer_overflow::IntegerOverflowDetector;
pub use issue::{Issue, Severity};

use cbse_sevm::HookRegistry;

/// A detection module that can install itself into an engine's hook table.
///
/// Implementors close over their own `Vec<Issue>` (typically behind an
/// `Rc<RefCell<..>>` so the registered closures can push into it) and expose
/// that list through `issues()` once exploration is done.
pub trait DetectionModule<'ctx> {
    /// Register this module's pre/post hooks against `registry`.
    fn register(&self, registry: &mut HookRegistry<'ctx>);

    /// Issues recorded so far by this module's hooks.
    fn issues(&self) -> Vec<Issue>;

    /// SWC identifier this module reports under, for driver-side filtering
    /// against `Config.modules`.
    fn swc_id(&self) -> &'static str;
}

/// Register every built-in detection module against `registry`, returning
/// handles whose `issues()` can be polled once exploration finishes.
///
/// This is the Rust-native stand-in for the `ModuleLoader`, which
/// walks `modules/modules/` and instantiates every `DetectionModule`
/// subclass it finds. There is no dynamic discovery here: the built-in set
/// is fixed at compile time and a caller filters by `swc_id()` against
/// configured module names.
pub fn register_all<'ctx>(
    registry: &mut HookRegistry<'ctx>,
) -> Vec<Box<dyn DetectionModule<'ctx> + 'ctx>> {
    let assertion = AssertionViolationDetector::new();
    let overflow = IntegerOverflowDetector::new();
    let state_change = StateChangeAfterExternalCallDetector::new();

    assertion.register(registry);
    overflow.register(registry);
    state_change.register(registry);

    vec![
        Box::new(assertion),
        Box::new(overflow),
        Box::new(state_change),
    ]
}
