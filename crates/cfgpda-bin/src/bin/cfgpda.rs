use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use cfgpda::grammar::RuleEntry;
use cfgpda::parser::{DerivationStep, PdaMove};
use cfgpda::pda::{Configuration, Mode};
use cfgpda::{analyze, convert, AnalysisOptions, Grammar, GrammarSymbols, PointerPolicy, WordGenerator};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use petgraph::dot::Dot;
use serde::Serialize;

#[derive(Parser)]
#[command(version, about = "Context-free grammar tester and pushdown automaton simulator")]
struct Cli {
    /// Grammar file, text rules or a JSON list of {"var", "productions"}
    #[arg(short, long, global = true, conflicts_with = "rules")]
    grammar: Option<PathBuf>,

    /// Grammar rules inline, e.g. "S -> aSb | ε"
    #[arg(short, long, global = true)]
    rules: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Test whether the grammar generates a word and show a leftmost derivation
    Test {
        word: String,
        #[arg(long, value_enum, default_value_t = Policy::First)]
        policy: Policy,
    },
    /// Convert the grammar into a pushdown automaton
    Convert {
        /// Print Graphviz DOT instead of a transition list
        #[arg(long)]
        dot: bool,
    },
    /// Run the automaton on a word and print every configuration
    Simulate { word: String },
    /// Generate words of the given length
    Generate {
        len: usize,
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    First,
    Last,
}

impl From<Policy> for PointerPolicy {
    fn from(policy: Policy) -> PointerPolicy {
        match policy {
            Policy::First => PointerPolicy::First,
            Policy::Last => PointerPolicy::Last,
        }
    }
}

#[derive(Serialize)]
struct TestReport<'a> {
    word: &'a str,
    accepted: bool,
    furthest_index: usize,
    foreign_symbols: &'a [char],
    steps: &'a [DerivationStep],
    moves: &'a [PdaMove],
}

#[derive(Serialize)]
struct TransitionReport {
    from: String,
    to: String,
    label: String,
}

#[derive(Serialize)]
struct SimulationReport<'a> {
    word: &'a str,
    accepted: bool,
    mode: Mode,
    consumed: usize,
    /// every transition label, indexed by `Configuration::transition`
    transitions: Vec<String>,
    configurations: &'a [Configuration],
}

fn load_grammar(cli: &Cli) -> anyhow::Result<Grammar> {
    let symbols = GrammarSymbols::default();
    if let Some(rules) = &cli.rules {
        return Ok(Grammar::parse_with(rules, symbols)?);
    }
    let Some(path) = &cli.grammar else {
        bail!("no grammar given, use --grammar <FILE> or --rules <TEXT>");
    };

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let grammar = if path.extension().is_some_and(|ext| ext == "json") {
        let entries: Vec<RuleEntry> =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Grammar::from_entries(&entries, symbols)?
    } else {
        Grammar::parse_with(&text, symbols)?
    };
    Ok(grammar)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// top of the stack first
fn render_stack(stack: &[char], empty: char) -> String {
    let top_first: Vec<char> = stack.iter().rev().copied().collect();
    render_chars(&top_first, empty)
}

fn render_chars(chars: &[char], empty: char) -> String {
    if chars.is_empty() {
        empty.to_string()
    } else {
        chars.iter().collect()
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let grammar = load_grammar(&cli)?;
    info!("loaded grammar with {} productions", grammar.productions().len());
    let empty = grammar.symbols().empty;

    match &cli.command {
        Command::Test { word, policy } => {
            let options = AnalysisOptions {
                policy: (*policy).into(),
                limits: None,
            };
            let analysis = analyze(&grammar, word, &options)?;
            if cli.json {
                return print_json(&TestReport {
                    word,
                    accepted: analysis.accepted,
                    furthest_index: analysis.furthest_index,
                    foreign_symbols: &analysis.foreign_symbols,
                    steps: &analysis.steps,
                    moves: &analysis.moves,
                });
            }

            println!("{}\n", grammar);
            if !analysis.foreign_symbols.is_empty() {
                let foreign: String = analysis.foreign_symbols.iter().collect();
                println!("symbols not in the alphabet: {:?}", foreign);
            }
            if analysis.accepted {
                println!("{:?} is generated by the grammar", word);
                for step in &analysis.steps {
                    println!("{:>3}. {:<12} {} ⇒ {}", step.step, step.rule, step.before, step.after);
                }
            } else {
                println!(
                    "{:?} is not generated by the grammar (progress stopped after {} symbols)",
                    word, analysis.furthest_index
                );
            }
        }
        Command::Convert { dot } => {
            let npda = convert(&grammar);
            if *dot {
                let graph = npda.to_graph();
                println!("{}", Dot::new(&graph));
            } else if cli.json {
                let transitions: Vec<TransitionReport> = npda
                    .transitions()
                    .iter()
                    .map(|t| TransitionReport {
                        from: t.from.to_string(),
                        to: t.to.to_string(),
                        label: t.label(npda.symbols()),
                    })
                    .collect();
                return print_json(&transitions);
            } else {
                println!("{}", npda);
            }
        }
        Command::Simulate { word } => {
            let analysis = analyze(&grammar, word, &AnalysisOptions::default())?;
            let mut sim = analysis.simulation();
            let configurations = sim.run()?;

            if cli.json {
                return print_json(&SimulationReport {
                    word,
                    accepted: sim.is_accepted(),
                    mode: analysis.mode,
                    consumed: analysis.consumed,
                    transitions: analysis
                        .npda
                        .transitions()
                        .iter()
                        .map(|t| t.label(analysis.npda.symbols()))
                        .collect(),
                    configurations: &configurations,
                });
            }

            let input = &analysis.input;
            println!("{:>4}  {:<8} {:<12} {:<12} {}", "step", "state", "input", "stack", "transition");
            for (i, c) in configurations.iter().enumerate() {
                let rest: Vec<char> = input[c.input_pointer..].to_vec();
                let label = c
                    .transition
                    .map(|id| analysis.npda.transition(id).label(analysis.npda.symbols()))
                    .unwrap_or_default();
                println!(
                    "{:>4}  {:<8} {:<12} {:<12} {}",
                    i,
                    c.state.to_string(),
                    render_chars(&rest, empty),
                    render_stack(&c.stack, empty),
                    label
                );
            }
            if sim.is_accepted() {
                println!("accepted");
            } else {
                println!(
                    "rejected, the furthest run consumed {} of {} symbols",
                    analysis.consumed,
                    input.len()
                );
                if analysis.truncated {
                    println!("(search limits reached, a longer run may exist)");
                }
            }
        }
        Command::Generate { len, count } => {
            let mut generator = WordGenerator::new(&grammar);
            let mut words = Vec::new();
            for _ in 0..*count {
                match generator.generate_word(*len) {
                    Some(word) => words.push(word),
                    None => break,
                }
            }

            if cli.json {
                return print_json(&words);
            }
            if words.is_empty() {
                println!("no word of length {} found", len);
            }
            for word in &words {
                let chars: Vec<char> = word.chars().collect();
                println!("{}", render_chars(&chars, empty));
            }
        }
    }

    Ok(())
}
