use log::trace;
use serde::Serialize;
use thiserror::Error;

use super::search::{find_furthest_path, SearchLimits};
use super::{Npda, State, Transition, TransitionId};
use crate::parser::PdaMove;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("no transition of the automaton matches move `{0}`")]
    NoMatchingTransition(String),
    #[error("transition leaves {expected} but the automaton is in {found}")]
    StateMismatch { expected: State, found: State },
    #[error("transition pops `{expected}` from an empty stack")]
    StackUnderflow { expected: char },
    #[error("transition pops `{expected}` but `{found}` is on top of the stack")]
    StackMismatch { expected: char, found: char },
    #[error("transition reads `{expected}` at position {pos}, found {found:?}")]
    InputMismatch {
        expected: char,
        found: Option<char>,
        pos: usize,
    },
}

/// How the transition path was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// replayed from an extracted derivation
    AcceptPath,
    /// best effort run found by bounded search
    RejectPath,
}

/// Snapshot after a step. `stack` has its top as the last element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub state: State,
    pub stack: Vec<char>,
    pub input_pointer: usize,
    /// transition that led here, `None` for the initial configuration.
    /// Serialized as its index into [`Npda::transitions`].
    #[serde(serialize_with = "serialize_transition")]
    pub transition: Option<TransitionId>,
}

fn serialize_transition<S: serde::Serializer>(id: &Option<TransitionId>, serializer: S) -> Result<S::Ok, S::Error> {
    id.map(TransitionId::index).serialize(serializer)
}

/// Step-by-step replay of a fixed transition path.
#[derive(Clone, Debug)]
pub struct Simulation<'a> {
    npda: &'a Npda,
    input: Vec<char>,
    path: Vec<TransitionId>,
    mode: Mode,
    state: State,
    stack: Vec<char>,
    input_pointer: usize,
    index: usize,
}

impl<'a> Simulation<'a> {
    pub fn from_path(npda: &'a Npda, input: &[char], path: Vec<TransitionId>, mode: Mode) -> Simulation<'a> {
        Simulation {
            npda,
            input: input.to_vec(),
            path,
            mode,
            state: State::Qo,
            stack: Vec::new(),
            input_pointer: 0,
            index: 0,
        }
    }

    /// Maps each derivation move onto the automaton transition that performs
    /// it, framed by the initial and accepting transitions.
    pub fn accept_path(npda: &'a Npda, input: &[char], moves: &[PdaMove]) -> Result<Simulation<'a>, SimulationError> {
        let mut path = vec![npda.initial()];

        for m in moves {
            let wanted = match m {
                PdaMove::Expand { pop, push, .. } => Transition {
                    from: State::Qloop,
                    to: State::Qloop,
                    input: None,
                    stack_top: Some(*pop),
                    stack_push: push.iter().map(|s| s.as_char()).collect(),
                },
                PdaMove::Scan { terminal, .. } => Transition {
                    from: State::Qloop,
                    to: State::Qloop,
                    input: Some(*terminal),
                    stack_top: Some(*terminal),
                    stack_push: Vec::new(),
                },
                PdaMove::Accept => {
                    path.push(npda.accepting());
                    continue;
                }
            };
            let id = npda
                .find(&wanted)
                .ok_or_else(|| SimulationError::NoMatchingTransition(wanted.label(npda.symbols())))?;
            path.push(id);
        }

        Ok(Simulation::from_path(npda, input, path, Mode::AcceptPath))
    }

    pub fn reject_path(npda: &'a Npda, input: &[char], limits: &SearchLimits) -> Simulation<'a> {
        let outcome = find_furthest_path(npda, input, limits);
        Simulation::from_path(npda, input, outcome.path, Mode::RejectPath)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn current_state(&self) -> State {
        self.state
    }

    pub fn stack(&self) -> &[char] {
        &self.stack
    }

    pub fn input_pointer(&self) -> usize {
        self.input_pointer
    }

    pub fn transition_path(&self) -> &[TransitionId] {
        &self.path
    }

    pub fn transition_index(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.path.len()
    }

    /// Reaching `Qaccept` with the stack empty and the input consumed.
    pub fn is_accepted(&self) -> bool {
        self.state == State::Qaccept && self.stack.is_empty() && self.input_pointer == self.input.len()
    }

    pub fn configuration(&self) -> Configuration {
        Configuration {
            state: self.state,
            stack: self.stack.clone(),
            input_pointer: self.input_pointer,
            transition: self.index.checked_sub(1).map(|i| self.path[i]),
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Qo;
        self.stack.clear();
        self.input_pointer = 0;
        self.index = 0;
    }

    /// Applies the next transition of the path. Returns `Ok(None)` once the
    /// path is exhausted. The configuration is left untouched on error.
    pub fn step(&mut self) -> Result<Option<Configuration>, SimulationError> {
        let Some(id) = self.path.get(self.index).copied() else {
            return Ok(None);
        };
        let t = self.npda.transition(id);

        if t.from != self.state {
            return Err(SimulationError::StateMismatch {
                expected: t.from,
                found: self.state,
            });
        }
        if let Some(expected) = t.stack_top {
            match self.stack.last() {
                None => return Err(SimulationError::StackUnderflow { expected }),
                Some(found) if *found != expected => {
                    return Err(SimulationError::StackMismatch {
                        expected,
                        found: *found,
                    })
                }
                Some(_) => {}
            }
        }
        if let Some(expected) = t.input {
            let found = self.input.get(self.input_pointer).copied();
            if found != Some(expected) {
                return Err(SimulationError::InputMismatch {
                    expected,
                    found,
                    pos: self.input_pointer,
                });
            }
        }

        if t.stack_top.is_some() {
            self.stack.pop();
        }
        self.stack.extend(t.stack_push.iter().rev());
        if t.input.is_some() {
            self.input_pointer += 1;
        }
        self.state = t.to;
        self.index += 1;

        trace!(
            "step {}: {} -> {}, stack {:?}, input at {}",
            self.index,
            t.label(self.npda.symbols()),
            self.state,
            self.stack,
            self.input_pointer
        );

        Ok(Some(self.configuration()))
    }

    /// Replays the whole path from the start. The first configuration is the
    /// initial one.
    pub fn run(&mut self) -> Result<Vec<Configuration>, SimulationError> {
        self.reset();
        let mut configurations = vec![self.configuration()];
        while let Some(configuration) = self.step()? {
            configurations.push(configuration);
        }
        Ok(configurations)
    }
}
