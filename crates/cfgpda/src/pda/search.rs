//! Bounded search for the run of an automaton that gets furthest into an
//! input it cannot accept.
//!
//! The search is a breadth-first walk over configurations `(state, stack,
//! input position)`. Two configurations are the same for the search when they
//! agree on state, position and the part of the stack that can still come to
//! the top with the input that is left (see [`Npda::exposable_depth`]); the
//! rest of the stack can never be popped, so it cannot change how far a run
//! gets. A configuration is expanded at most once, a path is cut at
//! `max_depth` transitions, and the whole walk stops after
//! `max_configurations` distinct configurations.

use std::collections::{HashSet, VecDeque};

use log::{debug, warn};

use super::{Npda, State, TransitionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: usize,
    pub max_configurations: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: 256,
            max_configurations: 20_000,
        }
    }
}

impl SearchLimits {
    /// Scales the depth cap with the input and the automaton. Every consumed
    /// symbol needs at least one scan, and runs of expansions between two
    /// scans rarely exceed a few times the number of transitions.
    pub fn for_input(npda: &Npda, input_len: usize) -> SearchLimits {
        let per_symbol = 2 * npda.transitions().len() + 2;
        SearchLimits {
            max_depth: (input_len + 1) * per_symbol,
            ..SearchLimits::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub path: Vec<TransitionId>,
    /// input symbols consumed along `path`
    pub consumed: usize,
    pub accepted: bool,
    /// distinct configurations visited
    pub explored: usize,
    /// a limit cut the search short, a better path may exist
    pub truncated: bool,
}

#[derive(Clone)]
struct Config {
    state: State,
    stack: Vec<char>,
    pos: usize,
}

// configurations that differ only below the exposable part of the stack
#[derive(PartialEq, Eq, Hash)]
struct Key {
    state: State,
    pos: usize,
    exposed: Vec<char>,
}

impl Key {
    fn of(npda: &Npda, input: &[char], config: &Config) -> Key {
        let depth = npda.exposable_depth(&config.stack, input.len() - config.pos);
        Key {
            state: config.state,
            pos: config.pos,
            exposed: config.stack[config.stack.len() - depth..].to_vec(),
        }
    }
}

// paths are stored as parent links so configurations on the frontier do not
// each carry a copy of their history
struct Node {
    parent: Option<usize>,
    via: TransitionId,
    depth: usize,
}

fn path_to(nodes: &[Node], mut at: Option<usize>) -> Vec<TransitionId> {
    let mut path = Vec::new();
    while let Some(i) = at {
        path.push(nodes[i].via);
        at = nodes[i].parent;
    }
    path.reverse();
    path
}

// transitions that apply to `config`, in construction order
fn successors(npda: &Npda, input: &[char], config: &Config) -> Vec<(TransitionId, Config)> {
    let mut next = Vec::new();
    for (i, t) in npda.transitions().iter().enumerate() {
        if t.from != config.state {
            continue;
        }
        if let Some(top) = t.stack_top {
            if config.stack.last() != Some(&top) {
                continue;
            }
        }
        if let Some(a) = t.input {
            if input.get(config.pos) != Some(&a) {
                continue;
            }
        }

        let mut stack = config.stack.clone();
        if t.stack_top.is_some() {
            stack.pop();
        }
        stack.extend(t.stack_push.iter().rev());
        let pos = config.pos + usize::from(t.input.is_some());

        next.push((
            TransitionId(i as u32),
            Config {
                state: t.to,
                stack,
                pos,
            },
        ));
    }
    next
}

/// Finds the run that consumes the most input. Ties keep the run found
/// first, which is the one with the fewest transitions. An accepting run, if
/// one is reached, ends the search immediately.
pub fn find_furthest_path(npda: &Npda, input: &[char], limits: &SearchLimits) -> SearchOutcome {
    let root = Config {
        state: State::Qo,
        stack: Vec::new(),
        pos: 0,
    };

    let mut nodes: Vec<Node> = Vec::new();
    let mut visited: HashSet<Key> = HashSet::new();
    visited.insert(Key::of(npda, input, &root));
    let mut frontier: VecDeque<(Option<usize>, Config)> = VecDeque::from([(None, root)]);

    let mut best: Option<(usize, usize)> = None;
    let mut accepted_at: Option<usize> = None;
    let mut truncated = false;

    'search: while let Some((at, config)) = frontier.pop_front() {
        let depth = at.map_or(0, |i| nodes[i].depth);
        let next = successors(npda, input, &config);
        if depth >= limits.max_depth {
            truncated |= next.iter().any(|(_, child)| !visited.contains(&Key::of(npda, input, child)));
            continue;
        }

        for (via, child) in next {
            let key = Key::of(npda, input, &child);
            if visited.contains(&key) {
                continue;
            }
            if visited.len() >= limits.max_configurations {
                truncated = true;
                break 'search;
            }
            visited.insert(key);

            let index = nodes.len();
            nodes.push(Node {
                parent: at,
                via,
                depth: depth + 1,
            });

            if best.map_or(true, |(pos, _)| child.pos > pos) {
                best = Some((child.pos, index));
            }
            if child.state == State::Qaccept && child.stack.is_empty() && child.pos == input.len() {
                accepted_at = Some(index);
                break 'search;
            }
            frontier.push_back((Some(index), child));
        }
    }

    if truncated {
        warn!(
            "furthest-path search hit its limits (depth {}, {} configurations)",
            limits.max_depth, limits.max_configurations
        );
    }

    let end = accepted_at.or(best.map(|(_, i)| i));
    let path = path_to(&nodes, end);
    let consumed = path.iter().filter(|id| npda.transition(**id).input.is_some()).count();

    debug!(
        "furthest-path search: {} configurations, consumed {} of {}, accepted: {}",
        visited.len(),
        consumed,
        input.len(),
        accepted_at.is_some()
    );

    SearchOutcome {
        path,
        consumed,
        accepted: accepted_at.is_some(),
        explored: visited.len(),
        truncated,
    }
}
