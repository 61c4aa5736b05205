//! small hand parser for the text form of a grammar
//!
//! <grammar> ::= <rule> (("\n" | ";") <rule>)*
//!
//! <rule> ::= <var> <arrow> <alternative> ("|" <alternative>)*
//!
//! <arrow> ::= "->" | "→" | (configured arrow)
//!
//! blank lines and lines starting with `#` are skipped, whitespace inside an
//! alternative is ignored
use std::str::FromStr;

use super::{Grammar, GrammarError, GrammarSymbols, Var};

impl Grammar {
    pub fn parse_with(input: &str, symbols: GrammarSymbols) -> Result<Grammar, GrammarError> {
        let mut rules: Vec<(Var, Vec<String>)> = Vec::new();

        for line in input.split(|c| c == '\n' || c == ';') {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (lhs, rhs) = Self::split_arrow(line, &symbols.arrow)
                .ok_or_else(|| GrammarError::MissingArrow(line.to_string()))?;

            let lhs = lhs.trim();
            let mut lhs_chars = lhs.chars();
            let var = match (lhs_chars.next(), lhs_chars.next()) {
                (Some(c), None) => c,
                _ => return Err(GrammarError::InvalidVariable(lhs.to_string())),
            };

            let alternatives = rhs.split('|').map(|alt| alt.to_string()).collect();
            rules.push((var, alternatives));
        }

        Grammar::from_object(rules, symbols)
    }

    // earliest arrow wins, so "A -> a→b" keeps the second arrow as terminals
    fn split_arrow<'a>(line: &'a str, configured: &str) -> Option<(&'a str, &'a str)> {
        [configured, "->", "→"]
            .into_iter()
            .filter(|arrow| !arrow.is_empty())
            .filter_map(|arrow| line.find(arrow).map(|at| (at, arrow.len())))
            .min_by_key(|(at, _)| *at)
            .map(|(at, len)| (&line[..at], &line[at + len..]))
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grammar::parse_with(s, GrammarSymbols::default())
    }
}
