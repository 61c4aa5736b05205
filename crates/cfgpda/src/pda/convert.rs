use log::debug;

use super::{Npda, State, Transition, TransitionId};
use crate::grammar::Grammar;

fn push_unique(transitions: &mut Vec<Transition>, transition: Transition) {
    if !transitions.contains(&transition) {
        transitions.push(transition);
    }
}

/// Single-loop-state construction: initialise with `S$`, expand variables
/// and match terminals on `Qloop`, accept once the guard is on top.
///
/// Transitions come out in construction order with duplicates dropped, so
/// a grammar with identical alternatives yields fewer than
/// `|productions| + |terminals| + 2` of them.
pub fn convert(grammar: &Grammar) -> Npda {
    let symbols = grammar.symbols().clone();
    let mut transitions: Vec<Transition> = Vec::new();

    let initial = TransitionId::from_push(
        &mut transitions,
        Transition {
            from: State::Qo,
            to: State::Qloop,
            input: None,
            stack_top: None,
            stack_push: vec![grammar.start_symbol(), symbols.guard],
        },
    );

    for production in grammar.productions() {
        push_unique(
            &mut transitions,
            Transition {
                from: State::Qloop,
                to: State::Qloop,
                input: None,
                stack_top: Some(production.nonterminal()),
                stack_push: production.rhs().iter().map(|s| s.as_char()).collect(),
            },
        );
    }

    for terminal in grammar.terminals() {
        push_unique(
            &mut transitions,
            Transition {
                from: State::Qloop,
                to: State::Qloop,
                input: Some(*terminal),
                stack_top: Some(*terminal),
                stack_push: Vec::new(),
            },
        );
    }

    let accepting = TransitionId::from_push(
        &mut transitions,
        Transition {
            from: State::Qloop,
            to: State::Qaccept,
            input: None,
            stack_top: Some(symbols.guard),
            stack_push: Vec::new(),
        },
    );

    debug!(
        "converted {} productions and {} terminals into {} transitions",
        grammar.productions().len(),
        grammar.terminals().len(),
        transitions.len()
    );

    let nullable = grammar
        .variables()
        .iter()
        .copied()
        .filter(|v| grammar.is_nullable(*v))
        .collect();

    Npda {
        transitions,
        start: grammar.start_symbol(),
        symbols,
        variables: grammar.variables().to_vec(),
        nullable,
        initial,
        accepting,
    }
}
