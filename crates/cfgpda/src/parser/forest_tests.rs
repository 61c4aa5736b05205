use super::earley::{EarleyParser, Head, ParseResult};
use super::forest::{collect_expansions, ExtractError, ParseNode, PdaMove, PointerPolicy};
use crate::grammar::{Grammar, Symbol};

fn parse(rules: &str, input: &str) -> ParseResult {
    let grammar: Grammar = rules.parse().expect("grammar should parse");
    EarleyParser::new(&grammar).parse(input)
}

fn symbols(s: &str) -> Vec<Symbol> {
    s.chars().map(Symbol::classify).collect()
}

#[test]
fn rejected_input_has_no_forest() {
    let result = parse("S -> ab", "ac");
    assert!(result.forest().is_none());
}

#[test]
fn tree_children_follow_rhs_order() {
    let result = parse("S -> aSb | ε", "ab");
    let forest = result.forest().expect("accepted");
    let tree = forest.derivation_tree().expect("tree");

    assert_eq!(tree.lhs, Head::Var('S'));
    assert_eq!(tree.rhs, symbols("aSb"));
    assert_eq!((tree.start, tree.end), (0, 2));
    assert_eq!(tree.leaves(), "ab");

    match &tree.children[..] {
        [ParseNode::Terminal { value: 'a', start: 0, end: 1 }, ParseNode::Rule(inner), ParseNode::Terminal { value: 'b', start: 1, end: 2 }] =>
        {
            assert!(inner.rhs.is_empty());
            assert!(inner.children.is_empty());
            assert_eq!((inner.start, inner.end), (1, 1));
        }
        other => panic!("unexpected children {:?}", other),
    }
}

#[test]
fn build_tree_requires_complete_item() {
    let result = parse("S -> aSb | ε", "ab");
    let forest = result.forest().expect("accepted");
    let incomplete = result.chart()[1].items()[0];
    assert_eq!(forest.build_tree(incomplete), Err(ExtractError::Incomplete(incomplete)));
}

#[test]
fn expansions_in_leftmost_order() {
    let result = parse("S -> AB\nA -> a\nB -> b", "ab");
    let forest = result.forest().expect("accepted");
    let expansions = forest.expansions().expect("expansions");
    let lhs: Vec<char> = expansions.iter().map(|e| e.lhs).collect();
    assert_eq!(lhs, vec!['S', 'A', 'B']);

    let tree = forest.derivation_tree().expect("tree");
    assert_eq!(collect_expansions(&tree), expansions);
}

#[test]
fn derivation_steps_rewrite_leftmost_variable() {
    let result = parse("S -> aSb | ε", "aabb");
    let steps = result.forest().expect("accepted").one_derivation_steps().expect("steps");

    let trace: Vec<(&str, &str, &str)> = steps
        .iter()
        .map(|s| (s.rule.as_str(), s.before.as_str(), s.after.as_str()))
        .collect();
    assert_eq!(
        trace,
        vec![
            ("S → aSb", "S", "aSb"),
            ("S → aSb", "aSb", "aaSbb"),
            ("S → ε", "aaSbb", "aabb"),
        ]
    );
    assert_eq!(steps.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn empty_word_derivation() {
    let result = parse("S -> aS | ε", "");
    let forest = result.forest().expect("accepted");
    let steps = forest.one_derivation_steps().expect("steps");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].before, "S");
    assert_eq!(steps[0].after, "ε");

    assert_eq!(
        forest.to_pda_transitions().expect("moves"),
        vec![
            PdaMove::Expand {
                pop: 'S',
                push: vec![],
                pos: 0
            },
            PdaMove::Accept,
        ]
    );
}

#[test]
fn pda_moves_push_leftmost_on_top() {
    let result = parse("S -> aSb | ε", "ab");
    let moves = result.forest().expect("accepted").to_pda_transitions().expect("moves");
    assert_eq!(
        moves,
        vec![
            PdaMove::Expand {
                pop: 'S',
                push: symbols("aSb"),
                pos: 0
            },
            PdaMove::Scan { terminal: 'a', pos: 0 },
            PdaMove::Expand {
                pop: 'S',
                push: vec![],
                pos: 1
            },
            PdaMove::Scan { terminal: 'b', pos: 1 },
            PdaMove::Accept,
        ]
    );
}

#[test]
fn pointer_policies_both_yield_the_input() {
    let result = parse("S -> SS | a", "aaa");
    for policy in [PointerPolicy::First, PointerPolicy::Last] {
        let forest = result.forest().expect("accepted").with_policy(policy);
        let tree = forest.derivation_tree().expect("tree");
        assert_eq!(tree.leaves(), "aaa");

        let steps = forest.one_derivation_steps().expect("steps");
        assert_eq!(steps.last().map(|s| s.after.as_str()), Some("aaa"));
        // two binary splits and three leaves
        assert_eq!(steps.len(), 5);
    }
}

#[test]
fn first_policy_is_stable() {
    let result = parse("S -> SS | a", "aaa");
    let a = result.forest().expect("accepted").expansions().expect("expansions");
    let b = parse("S -> SS | a", "aaa")
        .forest()
        .expect("accepted")
        .expansions()
        .expect("expansions");
    assert_eq!(a, b);
}

#[test]
fn moves_serialize_with_kind_tag() {
    let moves = vec![
        PdaMove::Expand {
            pop: 'S',
            push: symbols("aS"),
            pos: 0,
        },
        PdaMove::Scan { terminal: 'a', pos: 0 },
        PdaMove::Accept,
    ];
    let json = serde_json::to_string(&moves).expect("serializable");
    assert_eq!(
        json,
        r#"[{"kind":"expand","pop":"S","push":["a","S"],"pos":0},{"kind":"scan","terminal":"a","pos":0},{"kind":"accept"}]"#
    );
}
