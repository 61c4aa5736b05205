use super::earley::{BackPointer, EarleyParser, Head, ParseResult};
use crate::grammar::{Grammar, Symbol};

fn parse(rules: &str, input: &str) -> ParseResult {
    let grammar: Grammar = rules.parse().expect("grammar should parse");
    EarleyParser::new(&grammar).parse(input)
}

fn described_set(result: &ParseResult, position: usize) -> Vec<String> {
    result.chart()[position]
        .items()
        .iter()
        .map(|id| result.describe(*id))
        .collect()
}

#[test]
fn chart_for_balanced_pair() {
    let result = parse("S -> aSb | ε", "ab");
    assert!(result.accepted);
    assert_eq!(result.furthest_index, 2);
    assert_eq!(result.chart().len(), 3);

    assert_eq!(
        described_set(&result, 0),
        vec!["S' → ·S, 0", "S → ·aSb, 0", "S → ·, 0", "S' → S·, 0"]
    );
    assert_eq!(
        described_set(&result, 1),
        vec!["S → a·Sb, 0", "S → ·aSb, 1", "S → ·, 1", "S → aS·b, 0"]
    );
    assert_eq!(described_set(&result, 2), vec!["S → aSb·, 0", "S' → S·, 0"]);
    assert_eq!(result.item_count(), 10);

    let accepting = result.accepting_item().expect("accepted input has an accepting item");
    assert_eq!(result.lhs(accepting), Head::Augmented);
    assert!(result.is_complete(accepting));
    assert_eq!(result.item(accepting).end, 2);
}

#[test]
fn scan_backpointers_record_consumed_terminal() {
    let result = parse("S -> aSb | ε", "ab");
    let closing = result.chart()[2].items()[0];
    assert_eq!(result.rhs(closing).len(), 3);

    match result.item(closing).back[0] {
        BackPointer::Scan { prev, terminal, at } => {
            assert_eq!(terminal, 'b');
            assert_eq!(at, 1);
            assert_eq!(result.describe(prev), "S → aS·b, 0");
        }
        other => panic!("expected scan backpointer, got {:?}", other),
    }
}

#[test]
fn rejected_inputs_report_furthest_progress() {
    let vectors: &[(&str, &str, bool, usize)] = &[
        ("S -> ab", "ac", false, 1),
        ("S -> ab", "ab", true, 2),
        ("S -> ab", "", false, 0),
        ("S -> aSb | ε", "a", false, 1),
        ("S -> aSb | ε", "b", false, 0),
        ("S -> aSb | ε", "ab a", false, 2),
        ("S -> aSb | ε", "", true, 0),
    ];

    for (rules, input, accepted, furthest) in vectors {
        let result = parse(rules, input);
        println!("{} on {:?}: {} / {}", rules, input, result.accepted, result.furthest_index);
        assert_eq!(result.accepted, *accepted, "{} on {:?}", rules, input);
        assert_eq!(result.furthest_index, *furthest, "{} on {:?}", rules, input);
        assert_eq!(result.accepting_item().is_some(), *accepted);
    }
}

#[test]
fn nullable_variable_completed_before_it_is_awaited() {
    // the second A is awaited only after A → ε has already completed at 0
    let result = parse("S -> AAc\nA -> ε", "c");
    assert!(result.accepted);

    let result = parse("S -> AB\nA -> ε | a\nB -> A", "");
    assert!(result.accepted);
}

#[test]
fn left_recursion_terminates() {
    for n in 1..6 {
        let input = "a".repeat(n);
        assert!(parse("S -> Sa | a", &input).accepted);
    }
    assert!(!parse("S -> Sa | a", "").accepted);
    assert!(!parse("S -> S", "a").accepted);
}

#[test]
fn identical_alternatives_share_chart_rules() {
    let result = parse("S -> a | a", "a");
    assert!(result.accepted);
    assert_eq!(result.chart()[0].len(), 2);
}

#[test]
fn ambiguity_merges_backpointers() {
    let result = parse("S -> SS | a", "aaa");
    assert!(result.accepted);

    let merged = result.items().iter().any(|item| item.back.len() > 1);
    assert!(merged);

    // one item per (rule, dot, start) in every set
    for set in result.chart() {
        let mut keys: Vec<_> = set
            .items()
            .iter()
            .map(|id| {
                let item = result.item(*id);
                (item.rule, item.dot, item.start)
            })
            .collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }
}

#[test]
fn foreign_symbols_fail_to_scan() {
    let result = parse("S -> aSb | ε", "ab a");
    assert!(!result.accepted);
    assert_eq!(result.input(), &['a', 'b', ' ', 'a']);
    assert!(result.chart()[3].is_empty());
}

#[test]
fn grammar_without_start_productions_never_accepts() {
    let result = parse("", "");
    assert!(!result.accepted);
    assert_eq!(result.start_symbol(), 'S');
    assert_eq!(result.rhs(result.chart()[0].items()[0]), &[Symbol::Nonterminal('S')]);
}
