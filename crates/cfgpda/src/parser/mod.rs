pub mod earley;
pub mod forest;

pub use earley::{BackPointer, ChartRule, EarleyItem, EarleyParser, EarleySet, Head, ItemId, ParseResult};
pub use forest::{
    collect_expansions, DerivationForest, DerivationStep, Expansion, ExtractError, ParseNode, PdaMove,
    PointerPolicy, RuleNode,
};

#[cfg(test)]
mod earley_tests;
#[cfg(test)]
mod forest_tests;
