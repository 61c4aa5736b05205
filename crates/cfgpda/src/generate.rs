//! Brute-force word generation by leftmost expansion.
//!
//! Breadth-first over sentential forms starting at the start symbol, always
//! rewriting the leftmost variable. Forms that can no longer derive a word
//! short enough are dropped, which keeps the search finite for a fixed
//! length. This is deliberately independent of the chart parser so the two
//! can be checked against each other.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::ops::ControlFlow;

use log::{debug, warn};

use crate::grammar::{Grammar, Symbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorLimits {
    /// longest sentential form kept on the queue
    pub max_form_len: usize,
    /// forms taken off the queue before giving up
    pub max_forms: usize,
}

impl GeneratorLimits {
    pub fn for_length(len: usize) -> GeneratorLimits {
        GeneratorLimits {
            max_form_len: 2 * len + 4,
            max_forms: 50_000,
        }
    }
}

pub struct WordGenerator<'g> {
    grammar: &'g Grammar,
    limits: Option<GeneratorLimits>,
    generated: HashSet<String>,
}

impl<'g> WordGenerator<'g> {
    pub fn new(grammar: &'g Grammar) -> WordGenerator<'g> {
        WordGenerator {
            grammar,
            limits: None,
            generated: HashSet::new(),
        }
    }

    /// Fixed limits instead of ones scaled to the requested length.
    pub fn with_limits(grammar: &'g Grammar, limits: GeneratorLimits) -> WordGenerator<'g> {
        WordGenerator {
            grammar,
            limits: Some(limits),
            generated: HashSet::new(),
        }
    }

    fn limits_for(&self, len: usize) -> GeneratorLimits {
        self.limits.unwrap_or_else(|| GeneratorLimits::for_length(len))
    }

    /// A word of exactly `len` terminals that this generator has not
    /// returned before, or `None` if there is none within the limits.
    pub fn generate_word(&mut self, len: usize) -> Option<String> {
        let limits = self.limits_for(len);
        let generated = &self.generated;
        let mut found = None;
        explore(self.grammar, len, &limits, |word| {
            if word.chars().count() == len && !generated.contains(word) {
                found = Some(word.to_string());
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });

        if let Some(word) = &found {
            self.generated.insert(word.clone());
        }
        found
    }

    /// Forgets which words were already returned.
    pub fn reset(&mut self) {
        self.generated.clear();
    }

    /// Every derivable word of at most `max_len` terminals, shortest first
    /// and alphabetical within a length.
    pub fn words_up_to(&self, max_len: usize) -> Vec<String> {
        let limits = self.limits_for(max_len);
        let mut words: BTreeSet<(usize, String)> = BTreeSet::new();
        explore(self.grammar, max_len, &limits, |word| {
            words.insert((word.chars().count(), word.to_string()));
            ControlFlow::Continue(())
        });
        words.into_iter().map(|(_, word)| word).collect()
    }
}

// feeds each terminal word of length <= max_len reached by the search to
// `visit` once, shortest derivations first
fn explore<F>(grammar: &Grammar, max_len: usize, limits: &GeneratorLimits, mut visit: F)
where
    F: FnMut(&str) -> ControlFlow<()>,
{
    let start = vec![Symbol::Nonterminal(grammar.start_symbol())];
    let mut queue: VecDeque<Vec<Symbol>> = VecDeque::from([start.clone()]);
    let mut seen: HashSet<Vec<Symbol>> = HashSet::from([start]);
    let mut taken = 0;

    while let Some(form) = queue.pop_front() {
        taken += 1;
        if taken > limits.max_forms {
            warn!("word generation stopped after {} forms", limits.max_forms);
            break;
        }

        let Some(at) = form.iter().position(|s| s.is_nonterminal()) else {
            let word: String = form.iter().map(|s| s.as_char()).collect();
            match visit(&word) {
                ControlFlow::Break(()) => break,
                ControlFlow::Continue(()) => continue,
            }
        };

        for production in grammar.productions_of(form[at].as_char()) {
            let mut next = Vec::with_capacity(form.len() + production.len());
            next.extend_from_slice(&form[..at]);
            next.extend_from_slice(production.rhs());
            next.extend_from_slice(&form[at + 1..]);

            if next.len() > limits.max_form_len || grammar.min_length(&next) > max_len {
                continue;
            }
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    debug!("word generation took {} forms, {} distinct", taken, seen.len());
}
