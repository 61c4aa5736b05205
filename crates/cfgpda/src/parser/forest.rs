//! Reconstructs one concrete derivation from an accepted chart.
//!
//! The walk follows a single backpointer per item (the first one recorded by
//! default), so for an ambiguous grammar the result is one of the valid parse
//! trees, chosen deterministically but not canonically. From that tree two
//! linear views are derived: the leftmost derivation as sentential forms, and
//! the expand/scan/accept moves a pushdown automaton makes on the same input.

use std::collections::HashSet;

use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

use super::earley::{BackPointer, Head, ItemId, ParseResult};
use crate::grammar::{render_symbols, Symbol, Var};

/// Which backpointer to follow when an item was derived more than once.
///
/// `First` always terminates: a backpointer recorded at creation only names
/// items that already existed. `Last` can run into cycles on grammars with
/// empty derivations, which is reported as an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerPolicy {
    #[default]
    First,
    Last,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("the input was not accepted, there is no derivation to extract")]
    NotAccepted,
    #[error("item {0} is not complete")]
    Incomplete(ItemId),
    #[error("item {0} has advanced its dot but records no backpointer")]
    MissingBackpointer(ItemId),
    #[error("children of item {item} do not line up with its right-hand side at symbol {position}")]
    ChildMismatch { item: ItemId, position: usize },
    #[error("backpointers of item {0} lead back to itself")]
    CyclicBackpointers(ItemId),
    #[error("expansion of `{expected}` does not apply to the leftmost variable (found {found:?})")]
    LeftmostMismatch { expected: Var, found: Option<Var> },
    #[error("derivation yields `{derived}` instead of the input")]
    YieldMismatch { derived: String },
    #[error("popped `{popped}` at position {pos} but the next expansion is for {expansion:?}")]
    DerivationMismatch {
        popped: Var,
        expansion: Option<Var>,
        pos: usize,
    },
    #[error("expected `{expected}` at position {pos}, found {found:?}")]
    InputMismatch {
        expected: char,
        found: Option<char>,
        pos: usize,
    },
    #[error("stack emptied at position {pos} before the input was consumed")]
    StackExhausted { pos: usize },
    #[error("only {used} of {total} expansions were replayed")]
    UnusedExpansions { used: usize, total: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseNode {
    Rule(RuleNode),
    Terminal { value: char, start: usize, end: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleNode {
    pub lhs: Head,
    pub rhs: Vec<Symbol>,
    pub children: Vec<ParseNode>,
    pub start: usize,
    pub end: usize,
}

impl RuleNode {
    /// Terminals at the leaves, left to right.
    pub fn leaves(&self) -> String {
        let mut accum = String::new();
        for child in &self.children {
            match child {
                ParseNode::Terminal { value, .. } => accum.push(*value),
                ParseNode::Rule(node) => accum.push_str(&node.leaves()),
            }
        }
        accum
    }
}

/// One production application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub lhs: Var,
    pub rhs: Vec<Symbol>,
}

/// One row of a leftmost derivation: `before ⇒ after` by `rule`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DerivationStep {
    pub step: usize,
    pub rule: String,
    pub lhs: Var,
    pub rhs: Vec<Symbol>,
    pub before: String,
    pub after: String,
}

/// One move of the stack-driven leftmost derivation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PdaMove {
    Expand { pop: Var, push: Vec<Symbol>, pos: usize },
    Scan { terminal: char, pos: usize },
    Accept,
}

/// Pre-order walk: each rule node contributes its expansion before those of
/// its children, which is exactly leftmost-derivation order.
pub fn collect_expansions(node: &RuleNode) -> Vec<Expansion> {
    let mut expansions = Vec::new();
    collect_into(node, &mut expansions);
    expansions
}

fn collect_into(node: &RuleNode, expansions: &mut Vec<Expansion>) {
    if let Head::Var(lhs) = node.lhs {
        expansions.push(Expansion {
            lhs,
            rhs: node.rhs.clone(),
        });
    }
    for child in &node.children {
        if let ParseNode::Rule(child) = child {
            collect_into(child, expansions);
        }
    }
}

pub struct DerivationForest<'r> {
    result: &'r ParseResult,
    policy: PointerPolicy,
}

impl ParseResult {
    /// `None` when the input was rejected; there is nothing to extract.
    pub fn forest(&self) -> Option<DerivationForest<'_>> {
        self.accepted.then_some(DerivationForest {
            result: self,
            policy: PointerPolicy::default(),
        })
    }
}

impl<'r> DerivationForest<'r> {
    pub fn with_policy(mut self, policy: PointerPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn select<'a>(&self, back: &'a [BackPointer]) -> Option<&'a BackPointer> {
        match self.policy {
            PointerPolicy::First => back.first(),
            PointerPolicy::Last => back.last(),
        }
    }

    /// Builds the parse subtree rooted at a complete item.
    pub fn build_tree(&self, id: ItemId) -> Result<RuleNode, ExtractError> {
        let mut visiting = HashSet::new();
        self.build(id, &mut visiting)
    }

    fn build(&self, id: ItemId, visiting: &mut HashSet<ItemId>) -> Result<RuleNode, ExtractError> {
        let result = self.result;
        if !result.is_complete(id) {
            return Err(ExtractError::Incomplete(id));
        }
        if !visiting.insert(id) {
            return Err(ExtractError::CyclicBackpointers(id));
        }
        trace!("build tree from {}", result.describe(id));

        // backpointers run right to left along the rhs
        let mut pieces: Vec<ParseNode> = Vec::new();
        let mut cur = id;
        while result.item(cur).dot > 0 {
            let bp = self
                .select(&result.item(cur).back)
                .ok_or(ExtractError::MissingBackpointer(cur))?;
            match *bp {
                BackPointer::Scan { prev, terminal, at } => {
                    pieces.push(ParseNode::Terminal {
                        value: terminal,
                        start: at,
                        end: at + 1,
                    });
                    cur = prev;
                }
                BackPointer::Complete { left, right, .. } => {
                    let child = self.build(right, visiting)?;
                    pieces.push(ParseNode::Rule(child));
                    cur = left;
                }
            }
        }
        visiting.remove(&id);
        pieces.reverse();

        let rule = result.rule(id);
        if pieces.len() != rule.rhs.len() {
            return Err(ExtractError::ChildMismatch {
                item: id,
                position: pieces.len().min(rule.rhs.len()),
            });
        }
        for (position, (symbol, piece)) in rule.rhs.iter().zip(&pieces).enumerate() {
            let lines_up = match (symbol, piece) {
                (Symbol::Terminal(t), ParseNode::Terminal { value, .. }) => t == value,
                (Symbol::Nonterminal(v), ParseNode::Rule(node)) => node.lhs == Head::Var(*v),
                _ => false,
            };
            if !lines_up {
                return Err(ExtractError::ChildMismatch { item: id, position });
            }
        }

        let item = result.item(id);
        Ok(RuleNode {
            lhs: rule.head,
            rhs: rule.rhs.clone(),
            children: pieces,
            start: item.start,
            end: item.end,
        })
    }

    /// The start symbol's subtree under the accepting `S' → S ·` item.
    pub fn derivation_tree(&self) -> Result<RuleNode, ExtractError> {
        let result = self.result;
        let accepting = result.accepting_item().ok_or(ExtractError::NotAccepted)?;
        let root = self.build_tree(accepting)?;
        match root.children.into_iter().next() {
            Some(ParseNode::Rule(tree)) => Ok(tree),
            _ => Err(ExtractError::ChildMismatch {
                item: accepting,
                position: 0,
            }),
        }
    }

    pub fn expansions(&self) -> Result<Vec<Expansion>, ExtractError> {
        let tree = self.derivation_tree()?;
        let expansions = collect_expansions(&tree);
        debug!("extracted {} expansions", expansions.len());
        Ok(expansions)
    }

    /// Replays the expansions on sentential forms, rewriting the leftmost
    /// variable each time, from the start symbol down to the input.
    pub fn one_derivation_steps(&self) -> Result<Vec<DerivationStep>, ExtractError> {
        let result = self.result;
        let symbols = result.symbols();
        let expansions = self.expansions()?;

        let mut form: Vec<Symbol> = vec![Symbol::Nonterminal(result.start_symbol())];
        let mut steps = Vec::with_capacity(expansions.len());

        for (i, expansion) in expansions.into_iter().enumerate() {
            let leftmost = form.iter().position(|s| s.is_nonterminal());
            let at = match leftmost {
                Some(k) if form[k] == Symbol::Nonterminal(expansion.lhs) => k,
                other => {
                    return Err(ExtractError::LeftmostMismatch {
                        expected: expansion.lhs,
                        found: other.map(|k| form[k].as_char()),
                    })
                }
            };

            let before = render_symbols(&form, symbols.empty);
            form.splice(at..at + 1, expansion.rhs.iter().copied());
            let after = render_symbols(&form, symbols.empty);

            steps.push(DerivationStep {
                step: i + 1,
                rule: format!(
                    "{} {} {}",
                    expansion.lhs,
                    symbols.arrow,
                    render_symbols(&expansion.rhs, symbols.empty)
                ),
                lhs: expansion.lhs,
                rhs: expansion.rhs,
                before,
                after,
            });
        }

        let derived: String = form.iter().map(|s| s.as_char()).collect();
        let input: String = result.input().iter().collect();
        if form.iter().any(|s| s.is_nonterminal()) || derived != input {
            return Err(ExtractError::YieldMismatch { derived });
        }

        Ok(steps)
    }

    /// Drives a stack with the extracted expansions: pop a variable and push
    /// its expansion (leftmost symbol on top), or pop a terminal and match it
    /// against the input.
    pub fn to_pda_transitions(&self) -> Result<Vec<PdaMove>, ExtractError> {
        let result = self.result;
        let input = result.input();
        let expansions = self.expansions()?;

        let mut moves = Vec::new();
        let mut stack: Vec<Symbol> = vec![Symbol::Nonterminal(result.start_symbol())];
        let mut next = 0;
        let mut pos = 0;

        loop {
            let Some(top) = stack.pop() else {
                if pos == input.len() {
                    moves.push(PdaMove::Accept);
                    break;
                }
                return Err(ExtractError::StackExhausted { pos });
            };

            match top {
                Symbol::Nonterminal(v) => {
                    let expansion = expansions.get(next);
                    next += 1;
                    match expansion {
                        Some(e) if e.lhs == v => {
                            stack.extend(e.rhs.iter().rev());
                            trace!("expand {} at {}", v, pos);
                            moves.push(PdaMove::Expand {
                                pop: v,
                                push: e.rhs.clone(),
                                pos,
                            });
                        }
                        other => {
                            return Err(ExtractError::DerivationMismatch {
                                popped: v,
                                expansion: other.map(|e| e.lhs),
                                pos,
                            })
                        }
                    }
                }
                Symbol::Terminal(t) => {
                    if input.get(pos) != Some(&t) {
                        return Err(ExtractError::InputMismatch {
                            expected: t,
                            found: input.get(pos).copied(),
                            pos,
                        });
                    }
                    trace!("scan {} at {}", t, pos);
                    moves.push(PdaMove::Scan { terminal: t, pos });
                    pos += 1;
                }
            }
        }

        if next != expansions.len() {
            return Err(ExtractError::UnusedExpansions {
                used: next,
                total: expansions.len(),
            });
        }

        Ok(moves)
    }
}
