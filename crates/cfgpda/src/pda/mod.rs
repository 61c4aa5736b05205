use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::grammar::{GrammarSymbols, Var};

mod convert;
pub mod search;
pub mod simulate;

pub use convert::convert;
pub use search::{find_furthest_path, SearchLimits, SearchOutcome};
pub use simulate::{Configuration, Mode, Simulation, SimulationError};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum State {
    Qo,
    Qloop,
    Qaccept,
}

impl State {
    pub const ALL: [State; 3] = [State::Qo, State::Qloop, State::Qaccept];
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Qo => "Qo",
            State::Qloop => "Qloop",
            State::Qaccept => "Qaccept",
        };
        f.write_str(name)
    }
}

/// `None` for `input` or `stack_top` is the empty marker; an empty
/// `stack_push` pushes nothing. `stack_push` is written leftmost-first, the
/// leftmost symbol ends up on top of the stack.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub input: Option<char>,
    pub stack_top: Option<char>,
    pub stack_push: Vec<char>,
}

cfgpda_util::make_type_idx!(TransitionId, Transition);

impl Transition {
    /// `a, A → α` with the empty marker for anything missing.
    pub fn label(&self, symbols: &GrammarSymbols) -> String {
        format!(
            "{}, {} {} {}",
            self.input.unwrap_or(symbols.empty),
            self.stack_top.unwrap_or(symbols.empty),
            symbols.arrow,
            cfgpda_util::join_or_empty(self.stack_push.iter().copied(), symbols.empty)
        )
    }

    pub fn is_loop(&self) -> bool {
        self.from == State::Qloop && self.to == State::Qloop
    }
}

/// Three-state pushdown automaton built from a grammar by [`convert`].
#[derive(Clone, Debug)]
pub struct Npda {
    pub(crate) transitions: Vec<Transition>,
    pub(crate) start: Var,
    pub(crate) symbols: GrammarSymbols,
    pub(crate) variables: Vec<Var>,
    pub(crate) nullable: Vec<Var>,
    pub(crate) initial: TransitionId,
    pub(crate) accepting: TransitionId,
}

impl Npda {
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id]
    }

    pub fn find(&self, transition: &Transition) -> Option<TransitionId> {
        self.transitions
            .iter()
            .position(|t| t == transition)
            .map(|i| TransitionId(i as u32))
    }

    pub fn start_symbol(&self) -> Var {
        self.start
    }

    pub fn symbols(&self) -> &GrammarSymbols {
        &self.symbols
    }

    pub fn is_variable(&self, c: char) -> bool {
        self.variables.contains(&c)
    }

    /// `Qo → Qloop`, pushes the start symbol over the guard.
    pub fn initial(&self) -> TransitionId {
        self.initial
    }

    /// `Qloop → Qaccept`, pops the guard.
    pub fn accepting(&self) -> TransitionId {
        self.accepting
    }

    /// Fewest input symbols that must still be consumed before the stack
    /// can empty down to the guard.
    pub fn min_length(&self, stack: &[char]) -> usize {
        stack
            .iter()
            .filter(|c| **c != self.symbols.guard)
            .filter(|c| !(self.is_variable(**c) && self.nullable.contains(*c)))
            .count()
    }

    /// How many symbols from the top of `stack` can still come to the top
    /// with `remaining` input left. Anything deeper sits below symbols that
    /// need more input than that to pop.
    pub fn exposable_depth(&self, stack: &[char], remaining: usize) -> usize {
        let mut need = 0;
        for (depth, c) in stack.iter().rev().enumerate() {
            need += self.min_length(std::slice::from_ref(c));
            if need > remaining {
                return depth + 1;
            }
        }
        stack.len()
    }

    /// Self-loops on `Qloop` that pop `top`, in construction order.
    pub fn loop_transitions_for(&self, top: char) -> impl Iterator<Item = (TransitionId, &Transition)> + '_ {
        self.transitions
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.is_loop() && t.stack_top == Some(top))
            .map(|(i, t)| (TransitionId(i as u32), t))
    }

    /// One node per state and one edge per (from, to) pair, labelled with
    /// every transition on that edge, one per line.
    pub fn to_graph(&self) -> DiGraph<State, String> {
        let mut graph: DiGraph<State, String> = DiGraph::new();
        let nodes: Vec<NodeIndex> = State::ALL.iter().map(|s| graph.add_node(*s)).collect();
        let node = |s: State| nodes[s as usize];

        let mut edges: Vec<((State, State), Vec<String>)> = Vec::new();
        for t in &self.transitions {
            let label = t.label(&self.symbols);
            match edges.iter_mut().find(|(k, _)| *k == (t.from, t.to)) {
                Some((_, labels)) => labels.push(label),
                None => edges.push(((t.from, t.to), vec![label])),
            }
        }

        for ((from, to), labels) in edges {
            graph.add_edge(node(from), node(to), labels.join("\n"));
        }
        graph
    }
}

impl fmt::Display for Npda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.transitions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} → {}: {}", t.from, t.to, t.label(&self.symbols))?;
        }
        Ok(())
    }
}
