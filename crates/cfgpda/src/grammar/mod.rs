use std::collections::{HashMap, HashSet};
use std::fmt;

use bit_set::BitSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod text;


/// Variables are single uppercase letters.
pub type Var = char;

/// Reserved symbols used when reading and rendering grammars and automata.
///
/// Nothing in the crate reads these from global state; a `Grammar` carries the
/// set it was built with and hands it on to the automaton built from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSymbols {
    /// Marker for the empty string, both in productions and in transition labels.
    pub empty: char,
    /// Arrow used when rendering rules and stack operations.
    pub arrow: String,
    /// Stack-bottom guard pushed under the start symbol.
    pub guard: char,
}

impl Default for GrammarSymbols {
    fn default() -> Self {
        GrammarSymbols {
            empty: 'ε',
            arrow: "→".to_string(),
            guard: '$',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "char")]
pub enum Symbol {
    Terminal(char),
    Nonterminal(Var),
}

impl From<Symbol> for char {
    fn from(symbol: Symbol) -> char {
        symbol.as_char()
    }
}

impl Symbol {
    /// Uppercase ASCII letters are variables, everything else is a terminal.
    pub fn classify(c: char) -> Symbol {
        if c.is_ascii_uppercase() {
            Symbol::Nonterminal(c)
        } else {
            Symbol::Terminal(c)
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::Terminal(c) | Symbol::Nonterminal(c) => c,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }
}

/// Renders a symbol sequence, or the empty marker if there is nothing in it.
pub fn render_symbols(symbols: &[Symbol], empty: char) -> String {
    cfgpda_util::join_or_empty(symbols.iter().map(|s| s.as_char()), empty)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Production {
    Empty(Var),
    Nonempty(Var, Vec<Symbol>),
}

impl Production {
    pub fn nonterminal(&self) -> Var {
        match self {
            Production::Empty(nt) => *nt,
            Production::Nonempty(nt, _) => *nt,
        }
    }

    pub fn len(&self) -> usize {
        self.rhs().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Production::Empty(_))
    }

    pub fn rhs(&self) -> &[Symbol] {
        match self {
            Production::Empty(_) => &[],
            Production::Nonempty(_, rhs) => rhs,
        }
    }
}

/// JSON-friendly form of one rule: a variable and its alternatives as strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub var: Var,
    pub productions: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("`{0}` is not a valid variable (variables are single uppercase letters)")]
    InvalidVariable(String),
    #[error("variable `{0}` is defined more than once")]
    DuplicateVariable(Var),
    #[error("variable `{var}` is used in a production of `{lhs}` but never defined")]
    UndefinedVariable { var: Var, lhs: Var },
    #[error("rule `{0}` has no arrow")]
    MissingArrow(String),
    #[error("empty marker `{marker}` cannot appear inside production `{production}`")]
    MisplacedEmptyMarker { marker: char, production: String },
    #[error("`{0}` is reserved as the stack guard and cannot appear in a production")]
    ReservedSymbol(char),
}

#[derive(Clone, Debug)]
pub struct Grammar {
    // definition order, the first one is the start symbol
    variables: Vec<Var>,
    productions: Vec<Production>,
    nonterminal_index: HashMap<Var, Vec<usize>>,
    start: Var,
    terminals: Vec<char>,
    nullable: BitSet,
    symbols: GrammarSymbols,
}

// used when a grammar has no rules at all
const DEFAULT_START: Var = 'S';

impl Grammar {
    /// Builds a grammar from `(variable, alternatives)` pairs in definition order.
    /// An alternative that is blank or equal to the empty marker is the
    /// ε-production; whitespace inside an alternative is ignored.
    pub fn from_object<I, S>(rules: I, symbols: GrammarSymbols) -> Result<Grammar, GrammarError>
    where
        I: IntoIterator<Item = (Var, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut variables: Vec<Var> = Vec::new();
        let mut productions: Vec<Production> = Vec::new();

        for (var, alternatives) in rules {
            if !var.is_ascii_uppercase() {
                return Err(GrammarError::InvalidVariable(var.to_string()));
            }
            if variables.contains(&var) {
                return Err(GrammarError::DuplicateVariable(var));
            }
            variables.push(var);

            for alternative in alternatives {
                let production = Self::read_production(var, alternative.as_ref(), &symbols)?;
                productions.push(production);
            }
        }

        for production in &productions {
            for symbol in production.rhs() {
                if let Symbol::Nonterminal(nt) = symbol {
                    if !variables.contains(nt) {
                        return Err(GrammarError::UndefinedVariable {
                            var: *nt,
                            lhs: production.nonterminal(),
                        });
                    }
                }
            }
        }

        let start = variables.first().copied().unwrap_or(DEFAULT_START);
        Ok(Self::assemble(variables, productions, start, symbols))
    }

    pub fn from_entries(entries: &[RuleEntry], symbols: GrammarSymbols) -> Result<Grammar, GrammarError> {
        Self::from_object(
            entries.iter().map(|e| (e.var, e.productions.clone())),
            symbols,
        )
    }

    fn read_production(var: Var, text: &str, symbols: &GrammarSymbols) -> Result<Production, GrammarError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() || compact == symbols.empty.to_string() {
            return Ok(Production::Empty(var));
        }

        let mut rhs = Vec::with_capacity(compact.len());
        for c in compact.chars() {
            if c == symbols.empty {
                return Err(GrammarError::MisplacedEmptyMarker {
                    marker: c,
                    production: compact.clone(),
                });
            }
            if c == symbols.guard {
                return Err(GrammarError::ReservedSymbol(c));
            }
            rhs.push(Symbol::classify(c));
        }
        Ok(Production::Nonempty(var, rhs))
    }

    fn assemble(variables: Vec<Var>, productions: Vec<Production>, start: Var, symbols: GrammarSymbols) -> Grammar {
        let nonterminal_index = Self::compute_nonterminal_index(&productions);

        let mut terminals: Vec<char> = Vec::new();
        for production in &productions {
            for symbol in production.rhs() {
                if let Symbol::Terminal(t) = symbol {
                    if !terminals.contains(t) {
                        terminals.push(*t);
                    }
                }
            }
        }

        let nullable = Self::compute_nullable_nonterminals(&variables, &productions);

        Grammar {
            variables,
            productions,
            nonterminal_index,
            start,
            terminals,
            nullable,
            symbols,
        }
    }

    fn compute_nonterminal_index(productions: &[Production]) -> HashMap<Var, Vec<usize>> {
        let mut map: HashMap<Var, Vec<usize>> = HashMap::new();
        for (i, production) in productions.iter().enumerate() {
            map.entry(production.nonterminal()).or_default().push(i);
        }
        map
    }

    // n^2 in size of grammar, fine for hand-written grammars
    fn compute_nullable_nonterminals(variables: &[Var], productions: &[Production]) -> BitSet {
        let position = |v: Var| variables.iter().position(|x| *x == v);
        let mut nullables = BitSet::with_capacity(variables.len());
        loop {
            let mut changed = false;
            for rule in productions {
                let Some(nt) = position(rule.nonterminal()) else {
                    continue;
                };
                if nullables.contains(nt) {
                    continue;
                }
                let all_nullable = rule.rhs().iter().all(|x| match x {
                    Symbol::Terminal(_) => false,
                    Symbol::Nonterminal(v) => position(*v).is_some_and(|i| nullables.contains(i)),
                });
                if all_nullable {
                    changed |= nullables.insert(nt);
                }
            }

            if !changed {
                break;
            }
        }

        nullables
    }

    pub fn start_symbol(&self) -> Var {
        self.start
    }

    pub fn variables(&self) -> &[Var] {
        &self.variables
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn symbols(&self) -> &GrammarSymbols {
        &self.symbols
    }

    pub fn productions_of(&self, var: Var) -> impl Iterator<Item = &Production> + '_ {
        self.nonterminal_index
            .get(&var)
            .into_iter()
            .flatten()
            .map(move |i| &self.productions[*i])
    }

    pub fn is_variable(&self, c: char) -> bool {
        self.variables.contains(&c)
    }

    /// The terminal alphabet, in order of first appearance.
    pub fn terminals(&self) -> &[char] {
        &self.terminals
    }

    pub fn is_terminal(&self, c: char) -> bool {
        self.terminals.contains(&c)
    }

    pub fn is_nullable(&self, var: Var) -> bool {
        self.variables
            .iter()
            .position(|v| *v == var)
            .is_some_and(|i| self.nullable.contains(i))
    }

    /// Lower bound on the length of any word derivable from `form`.
    pub fn min_length(&self, form: &[Symbol]) -> usize {
        form.iter()
            .filter(|s| match s {
                Symbol::Terminal(_) => true,
                Symbol::Nonterminal(v) => !self.is_nullable(*v),
            })
            .count()
    }

    /// Characters of `input` outside the terminal alphabet, deduplicated.
    pub fn foreign_symbols(&self, input: &str) -> Vec<char> {
        let mut seen: HashSet<char> = HashSet::new();
        input
            .chars()
            .filter(|c| !self.is_terminal(*c))
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// The production mapping in definition order, ε rendered as the empty marker.
    pub fn to_object(&self) -> Vec<(Var, Vec<String>)> {
        self.variables
            .iter()
            .map(|v| {
                let alternatives = self
                    .productions_of(*v)
                    .map(|p| render_symbols(p.rhs(), self.symbols.empty))
                    .collect();
                (*v, alternatives)
            })
            .collect()
    }

    pub fn to_entries(&self) -> Vec<RuleEntry> {
        self.to_object()
            .into_iter()
            .map(|(var, productions)| RuleEntry { var, productions })
            .collect()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, alternatives)) in self.to_object().into_iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} {} {}", var, self.symbols.arrow, alternatives.join(" | "))?;
        }
        Ok(())
    }
}
