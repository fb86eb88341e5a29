// SPDX-License-Identifier: AGPL-3.0

//! Pluggable path-exploration strategies.
//!
//! The engine takes its strategy as a constructor argument and drains it one
//! state at a time, so swapping in a different exploration order never
//! touches the main loop. `SearchStrategy` captures that contract: anything
//! that can hand back the next state to explore.

use crate::ExecState;

/// Selects which `SearchStrategy` implementation `SEVM::execute_call` drives
/// its worklist with, mirroring `Config.strategy`'s `"dfs"`/`"bfs"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    DepthFirst,
    BreadthFirst,
}

impl StrategyKind {
    /// Parses the config string, defaulting to depth-first for anything
    /// unrecognized rather than failing the run over a typo'd flag.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" | "breadth-first" | "breadthfirst" => StrategyKind::BreadthFirst,
            _ => StrategyKind::DepthFirst,
        }
    }

    pub fn build<'ctx>(self, max_depth: Option<usize>) -> Box<dyn SearchStrategy<'ctx> + 'ctx> {
        match self {
            StrategyKind::DepthFirst => Box::new(DepthFirstSearchStrategy::new(max_depth)),
            StrategyKind::BreadthFirst => Box::new(BreadthFirstSearchStrategy::new(max_depth)),
        }
    }
}

/// Chooses which pending execution state to explore next.
///
/// Implementations own the pending-state storage entirely; the engine never
/// reaches past this trait to manipulate it directly.
pub trait SearchStrategy<'ctx> {
    fn push(&mut self, state: ExecState<'ctx>);
    fn pop(&mut self) -> Option<ExecState<'ctx>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Depth-first search: always resume the most recently pushed state.
///
/// This is the engine's default search discipline.
#[derive(Debug, Default)]
pub struct DepthFirstSearchStrategy<'ctx> {
    stack: Vec<ExecState<'ctx>>,
    /// Maximum path length in instructions a state may reach before it is
    /// dropped instead of pushed (`Config.depth`, the `max_depth` cutoff).
    max_depth: Option<usize>,
}

impl<'ctx> DepthFirstSearchStrategy<'ctx> {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }
}

impl<'ctx> SearchStrategy<'ctx> for DepthFirstSearchStrategy<'ctx> {
    fn push(&mut self, state: ExecState<'ctx>) {
        if let Some(limit) = self.max_depth {
            if state.instructions_executed > limit {
                return;
            }
        }
        self.stack.push(state);
    }

    fn pop(&mut self) -> Option<ExecState<'ctx>> {
        self.stack.pop()
    }

    fn len(&self) -> usize {
        self.stack.len()
    }
}

/// Breadth-first search: always resume the oldest pending state.
///
/// Not the engine's default, but kept alongside DFS to exercise the
/// `SearchStrategy` trait with more than one implementation, matching the
/// spec's requirement that the search strategy be genuinely pluggable.
#[derive(Debug, Default)]
pub struct BreadthFirstSearchStrategy<'ctx> {
    queue: std::collections::VecDeque<ExecState<'ctx>>,
    max_depth: Option<usize>,
}

impl<'ctx> BreadthFirstSearchStrategy<'ctx> {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            queue: std::collections::VecDeque::new(),
            max_depth,
        }
    }
}

impl<'ctx> SearchStrategy<'ctx> for BreadthFirstSearchStrategy<'ctx> {
    fn push(&mut self, state: ExecState<'ctx>) {
        if let Some(limit) = self.max_depth {
            if state.instructions_executed > limit {
                return;
            }
        }
        self.queue.push_back(state);
    }

    fn pop(&mut self) -> Option<ExecState<'ctx>> {
        self.queue.pop_front()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kind_parses_config_string() {
        assert_eq!(StrategyKind::parse("bfs"), StrategyKind::BreadthFirst);
        assert_eq!(StrategyKind::parse("BFS"), StrategyKind::BreadthFirst);
        assert_eq!(StrategyKind::parse("dfs"), StrategyKind::DepthFirst);
        assert_eq!(StrategyKind::parse("nonsense"), StrategyKind::DepthFirst);
    }

    fn state_at_depth(ctx: &z3::Context, instructions_executed: usize) -> ExecState {
        let solver = std::rc::Rc::new(z3::Solver::new(ctx));
        let message = cbse_traces::CallMessage::new(0, 0, 0, Vec::new(), 0xF1, false);
        let output = cbse_traces::CallOutput::new(None, None, None);
        let call_context = cbse_traces::CallContext::new(message, output, 0);
        let mut state = ExecState::new(ctx, call_context, solver);
        state.instructions_executed = instructions_executed;
        state
    }

    #[test]
    fn depth_first_drops_states_past_max_depth() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut strategy = DepthFirstSearchStrategy::new(Some(10));
        strategy.push(state_at_depth(&ctx, 5));
        strategy.push(state_at_depth(&ctx, 11));
        assert_eq!(strategy.len(), 1);
    }

    #[test]
    fn breadth_first_drops_states_past_max_depth() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut strategy = BreadthFirstSearchStrategy::new(Some(10));
        strategy.push(state_at_depth(&ctx, 5));
        strategy.push(state_at_depth(&ctx, 11));
        assert_eq!(strategy.len(), 1);
    }

    #[test]
    fn no_max_depth_never_drops_states() {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let mut strategy = DepthFirstSearchStrategy::new(None);
        strategy.push(state_at_depth(&ctx, 1_000_000));
        assert_eq!(strategy.len(), 1);
    }
}
