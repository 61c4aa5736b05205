pub mod analysis;
pub mod generate;
pub mod grammar;
pub mod parser;
pub mod pda;


pub use analysis::{analyze, Analysis, AnalysisError, AnalysisOptions};
pub use generate::{GeneratorLimits, WordGenerator};
pub use grammar::{Grammar, GrammarError, GrammarSymbols, Production, RuleEntry, Symbol, Var};
pub use parser::{EarleyParser, ParseResult, PointerPolicy};
pub use pda::{convert, Npda, Simulation, State};
