use cfgpda::pda::{Mode, SearchLimits, State};
use cfgpda::{analyze, AnalysisOptions, Grammar, PointerPolicy};

fn grammar(text: &str) -> Grammar {
    text.parse().expect("grammar should parse")
}

#[test]
fn accepted_word_replays_to_acceptance() {
    let g = grammar("S -> aSb | ε");
    let analysis = analyze(&g, "aabb", &AnalysisOptions::default()).expect("analysis");

    assert!(analysis.accepted);
    assert_eq!(analysis.mode, Mode::AcceptPath);
    assert_eq!(analysis.consumed, 4);
    assert_eq!(analysis.steps.len(), 3);
    // initial transition, one per move
    assert_eq!(analysis.path.len(), analysis.moves.len() + 1);
    assert!(analysis.foreign_symbols.is_empty());

    let mut sim = analysis.simulation();
    assert_eq!(sim.transition_index(), 0);
    let configurations = sim.run().expect("replay");
    assert!(sim.is_accepted());

    let last = configurations.last().expect("configurations");
    assert_eq!(last.state, State::Qaccept);
    assert!(last.stack.is_empty());
    assert_eq!(last.input_pointer, 4);
}

#[test]
fn rejected_word_gets_furthest_run() {
    let g = grammar("S -> ab");
    let analysis = analyze(&g, "ac", &AnalysisOptions::default()).expect("analysis");

    assert!(!analysis.accepted);
    assert_eq!(analysis.furthest_index, 1);
    assert_eq!(analysis.mode, Mode::RejectPath);
    assert_eq!(analysis.consumed, 1);
    assert!(analysis.steps.is_empty());
    assert!(analysis.moves.is_empty());
    assert_eq!(analysis.foreign_symbols, vec!['c']);

    let mut sim = analysis.simulation();
    sim.run().expect("search paths replay");
    assert_eq!(sim.input_pointer(), 1);
    assert_eq!(sim.current_state(), State::Qloop);
    assert_eq!(sim.stack(), &['$', 'b']);
    assert!(!sim.is_accepted());
}

#[test]
fn step_by_step_matches_run() {
    let g = grammar("S -> AB\nA -> a\nB -> b");
    let analysis = analyze(&g, "ab", &AnalysisOptions::default()).expect("analysis");

    let mut stepped = Vec::new();
    let mut sim = analysis.simulation();
    while let Some(configuration) = sim.step().expect("valid step") {
        stepped.push(configuration);
    }
    assert!(sim.is_finished());

    let mut again = analysis.simulation();
    let ran = again.run().expect("replay");
    assert_eq!(&ran[1..], &stepped[..]);
}

#[test]
fn both_pointer_policies_replay() {
    let g = grammar("S -> SS | a");
    for policy in [PointerPolicy::First, PointerPolicy::Last] {
        let options = AnalysisOptions { policy, limits: None };
        let analysis = analyze(&g, "aaaa", &options).expect("analysis");
        assert!(analysis.accepted);
        assert_eq!(analysis.steps.last().map(|s| s.after.as_str()), Some("aaaa"));
    }
}

#[test]
fn tight_limits_are_reported() {
    let g = grammar("S -> SS | ε");
    let options = AnalysisOptions {
        policy: PointerPolicy::First,
        limits: Some(SearchLimits {
            max_depth: 20,
            max_configurations: 100,
        }),
    };
    let analysis = analyze(&g, "a", &options).expect("analysis");
    assert!(!analysis.accepted);
    assert!(analysis.truncated);
    assert_eq!(analysis.consumed, 0);
}
