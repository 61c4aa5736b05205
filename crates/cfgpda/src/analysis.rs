use log::debug;
use thiserror::Error;

use crate::grammar::Grammar;
use crate::parser::{DerivationStep, EarleyParser, ExtractError, ParseResult, PdaMove, PointerPolicy};
use crate::pda::{
    convert, find_furthest_path, Mode, Npda, SearchLimits, Simulation, SimulationError, State, TransitionId,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("derivation could not be extracted: {0}")]
    Extract(#[from] ExtractError),
    #[error("derivation does not replay on the automaton: {0}")]
    Simulation(#[from] SimulationError),
    #[error("replaying the derivation ends in {state} with {remaining} stack symbols and input at {pointer}")]
    NotAccepting {
        state: State,
        remaining: usize,
        pointer: usize,
    },
    #[error("the automaton accepts an input the parser rejected")]
    SearchAccepted,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AnalysisOptions {
    pub policy: PointerPolicy,
    /// `None` scales the search limits to the input
    pub limits: Option<SearchLimits>,
}

/// Everything the core produces for one grammar and one input.
#[derive(Debug)]
pub struct Analysis {
    pub input: Vec<char>,
    pub accepted: bool,
    pub furthest_index: usize,
    pub foreign_symbols: Vec<char>,
    /// empty when rejected
    pub steps: Vec<DerivationStep>,
    /// empty when rejected
    pub moves: Vec<PdaMove>,
    pub npda: Npda,
    pub result: ParseResult,
    pub path: Vec<TransitionId>,
    /// input symbols consumed by `path`
    pub consumed: usize,
    pub mode: Mode,
    /// the reject-path search hit its limits
    pub truncated: bool,
}

impl Analysis {
    /// A fresh replay of `path`, positioned before the first transition.
    pub fn simulation(&self) -> Simulation<'_> {
        Simulation::from_path(&self.npda, &self.input, self.path.clone(), self.mode)
    }
}

/// Parses `input`, and either extracts and replays its derivation on the
/// converted automaton, or searches the automaton for the run that gets
/// furthest. Rejection is reported through `Analysis::accepted`; errors mean
/// the pieces disagree with each other.
pub fn analyze(grammar: &Grammar, input: &str, options: &AnalysisOptions) -> Result<Analysis, AnalysisError> {
    let result = EarleyParser::new(grammar).parse(input);
    let npda = convert(grammar);
    let foreign_symbols = grammar.foreign_symbols(input);
    let chars = result.input().to_vec();

    let (steps, moves, path, consumed, mode, truncated) = match result.forest() {
        Some(forest) => {
            let forest = forest.with_policy(options.policy);
            let steps = forest.one_derivation_steps()?;
            let moves = forest.to_pda_transitions()?;

            let mut sim = Simulation::accept_path(&npda, &chars, &moves)?;
            sim.run()?;
            if !sim.is_accepted() {
                return Err(AnalysisError::NotAccepting {
                    state: sim.current_state(),
                    remaining: sim.stack().len(),
                    pointer: sim.input_pointer(),
                });
            }
            let path = sim.transition_path().to_vec();
            (steps, moves, path, chars.len(), Mode::AcceptPath, false)
        }
        None => {
            let limits = options
                .limits
                .unwrap_or_else(|| SearchLimits::for_input(&npda, chars.len()));
            let outcome = find_furthest_path(&npda, &chars, &limits);
            if outcome.accepted {
                return Err(AnalysisError::SearchAccepted);
            }

            let mut sim = Simulation::from_path(&npda, &chars, outcome.path.clone(), Mode::RejectPath);
            sim.run()?;
            (
                Vec::new(),
                Vec::new(),
                outcome.path,
                outcome.consumed,
                Mode::RejectPath,
                outcome.truncated,
            )
        }
    };

    debug!(
        "analysis of {:?}: accepted {}, {} steps, {} transitions on the path",
        input,
        result.accepted,
        steps.len(),
        path.len()
    );

    Ok(Analysis {
        input: chars,
        accepted: result.accepted,
        furthest_index: result.furthest_index,
        foreign_symbols,
        steps,
        moves,
        npda,
        result,
        path,
        consumed,
        mode,
        truncated,
    })
}
