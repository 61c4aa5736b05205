// exhaustive checks over small grammars and every string up to a small length

use std::collections::BTreeSet;

use cfgpda::parser::Expansion;
use cfgpda::pda::{find_furthest_path, SearchLimits};
use cfgpda::{convert, EarleyParser, Grammar, Simulation, Symbol, WordGenerator};

// (rules, alphabet, max length)
const GRAMMARS: &[(&str, &str, usize)] = &[
    ("S -> aSb | ε", "ab", 6),
    ("S -> SS | a", "a", 5),
    ("S -> AB\nA -> a\nB -> b", "ab", 4),
    ("S -> aS | ε", "a", 4),
    ("S -> ab", "ab", 3),
    ("E -> E+T | T\nT -> T*F | F\nF -> (E) | x", "x+*()", 4),
    ("S -> aSbS | bSaS | ε", "ab", 6),
    ("S -> ABC\nA -> B | ε\nB -> C | ε\nC -> c | ε", "c", 4),
    ("S -> A | a\nA -> S | b", "ab", 3),
    ("S -> aX | b\nX -> Xa", "ab", 3),
];

fn grammar(text: &str) -> Grammar {
    text.parse().expect("grammar should parse")
}

fn all_strings(alphabet: &str, max_len: usize) -> Vec<String> {
    let mut strings = vec![String::new()];
    let mut layer = vec![String::new()];
    for _ in 0..max_len {
        layer = layer
            .iter()
            .flat_map(|prefix| alphabet.chars().map(move |c| format!("{}{}", prefix, c)))
            .collect();
        strings.extend(layer.iter().cloned());
    }
    strings
}

// rewrites the leftmost variable with each expansion in turn
fn replay(start: char, expansions: &[Expansion]) -> Option<String> {
    let mut form = vec![Symbol::Nonterminal(start)];
    for expansion in expansions {
        let at = form.iter().position(|s| s.is_nonterminal())?;
        if form[at] != Symbol::Nonterminal(expansion.lhs) {
            return None;
        }
        form.splice(at..at + 1, expansion.rhs.iter().copied());
    }
    if form.iter().any(|s| s.is_nonterminal()) {
        return None;
    }
    Some(form.iter().map(|s| s.as_char()).collect())
}

#[test]
fn soundness_and_replay_identity() {
    for (rules, alphabet, max_len) in GRAMMARS {
        let g = grammar(rules);
        let parser = EarleyParser::new(&g);
        for w in all_strings(alphabet, *max_len) {
            let result = parser.parse(&w);
            let Some(forest) = result.forest() else {
                continue;
            };

            let expansions = forest.expansions().expect("accepted input has a derivation");
            assert_eq!(replay(g.start_symbol(), &expansions).as_deref(), Some(w.as_str()), "{} on {:?}", rules, w);

            let steps = forest.one_derivation_steps().expect("derivation replays");
            let last = steps.last().map(|s| s.after.clone()).expect("at least one step");
            let expected = if w.is_empty() { "ε".to_string() } else { w.clone() };
            assert_eq!(last, expected, "{} on {:?}", rules, w);
            assert_eq!(steps.len(), expansions.len());
        }
    }
}

#[test]
fn completeness_against_generator() {
    for (rules, alphabet, max_len) in GRAMMARS {
        let g = grammar(rules);
        let parser = EarleyParser::new(&g);

        let generated: BTreeSet<String> = WordGenerator::new(&g).words_up_to(*max_len).into_iter().collect();
        let accepted: BTreeSet<String> = all_strings(alphabet, *max_len)
            .into_iter()
            .filter(|w| parser.parse(w).accepted)
            .collect();

        println!("{}: {} words", rules, generated.len());
        assert_eq!(generated, accepted, "{}", rules);
    }
}

#[test]
fn npda_equivalence() {
    for (rules, alphabet, max_len) in GRAMMARS {
        let g = grammar(rules);
        let npda = convert(&g);
        let parser = EarleyParser::new(&g);

        for w in all_strings(alphabet, *max_len) {
            let result = parser.parse(&w);
            match result.forest() {
                Some(forest) => {
                    let moves = forest.to_pda_transitions().expect("moves");
                    let mut sim = Simulation::accept_path(&npda, result.input(), &moves).expect("moves map onto transitions");
                    sim.run().expect("derivation replays on the automaton");
                    assert!(sim.is_accepted(), "{} on {:?}", rules, w);
                    assert_eq!(sim.input_pointer(), w.len());
                    assert!(sim.stack().is_empty());
                }
                None => {
                    let limits = SearchLimits::for_input(&npda, w.len());
                    let outcome = find_furthest_path(&npda, result.input(), &limits);
                    assert!(!outcome.accepted, "{} on {:?}", rules, w);
                    // the longest viable prefix is what both sides measure
                    if !outcome.truncated {
                        assert_eq!(outcome.consumed, result.furthest_index, "{} on {:?}", rules, w);
                    } else {
                        assert!(outcome.consumed <= result.furthest_index, "{} on {:?}", rules, w);
                    }
                }
            }
        }
    }
}

#[test]
fn conversion_is_idempotent() {
    for (rules, _, _) in GRAMMARS {
        let g = grammar(rules);
        let first = convert(&g);
        let second = convert(&g);
        assert_eq!(first.transitions(), second.transitions());

        let count = g.productions().len() + g.terminals().len() + 2;
        assert!(first.transitions().len() <= count);
    }
}

#[test]
fn chart_determinism() {
    for (rules, alphabet, max_len) in GRAMMARS {
        let g = grammar(rules);
        for w in all_strings(alphabet, (*max_len).min(3)) {
            let a = EarleyParser::new(&g).parse(&w);
            let b = EarleyParser::new(&g).parse(&w);
            for (sa, sb) in a.chart().iter().zip(b.chart()) {
                let da: BTreeSet<String> = sa.items().iter().map(|id| a.describe(*id)).collect();
                let db: BTreeSet<String> = sb.items().iter().map(|id| b.describe(*id)).collect();
                assert_eq!(da, db);
            }
        }
    }
}

#[test]
fn empty_word_iff_start_is_nullable() {
    for (rules, _, _) in GRAMMARS {
        let g = grammar(rules);
        let accepted = EarleyParser::new(&g).parse("").accepted;
        assert_eq!(accepted, g.is_nullable(g.start_symbol()), "{}", rules);
    }
}

#[test]
fn single_terminal_grammar() {
    let g = grammar("S -> a");
    let parser = EarleyParser::new(&g);
    for w in all_strings("abc", 2) {
        assert_eq!(parser.parse(&w).accepted, w == "a", "{:?}", w);
    }
}
