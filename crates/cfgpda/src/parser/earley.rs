// Earley recognizer with backpointers
// Items live in one arena and are referenced by id everywhere else (chart sets,
// backpointers), so the chart can be walked after parsing without any
// ownership gymnastics.
// Worst case O(n^3) in input length; inputs are hand-typed test strings.

use std::collections::HashMap;

use log::{debug, trace};

use crate::grammar::{Grammar, GrammarSymbols, Symbol, Var};

cfgpda_util::make_type_idx!(ItemId, EarleyItem);

/// Left-hand side of a chart rule. `Augmented` is the added `S' → S`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Head {
    Augmented,
    Var(Var),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartRule {
    pub head: Head,
    pub rhs: Vec<Symbol>,
}

/// How an item came to be at its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackPointer {
    /// `prev` consumed `terminal` at input position `at`.
    Scan { prev: ItemId, terminal: char, at: usize },
    /// `left` was waiting for the variable that `right` completed at `at`.
    Complete { left: ItemId, right: ItemId, at: usize },
}

#[derive(Clone, Debug)]
pub struct EarleyItem {
    pub rule: usize,
    pub dot: usize,
    pub start: usize,
    /// chart position holding this item
    pub end: usize,
    /// first entry is the one recorded at creation; later ones are merged in
    /// when the same item is derived again
    pub back: Vec<BackPointer>,
}

// (rule, dot, start) identifies (lhs, rhs, dot, start) since identical
// alternatives are collapsed into one chart rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ItemKey {
    rule: usize,
    dot: usize,
    start: usize,
}

#[derive(Clone, Debug, Default)]
pub struct EarleySet {
    items: Vec<ItemId>,
    index: HashMap<ItemKey, ItemId>,
}

impl EarleySet {
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

const AUGMENTED_RULE: usize = 0;

struct ChartBuilder {
    sets: Vec<EarleySet>,
    items: Vec<EarleyItem>,
}

impl ChartBuilder {
    // returns the id and whether the item is new at this position
    fn add(&mut self, position: usize, key: ItemKey, via: Option<BackPointer>) -> (ItemId, bool) {
        if let Some(id) = self.sets[position].index.get(&key).copied() {
            if let Some(bp) = via {
                let back = &mut self.items[id].back;
                if !back.contains(&bp) {
                    back.push(bp);
                }
            }
            return (id, false);
        }

        let item = EarleyItem {
            rule: key.rule,
            dot: key.dot,
            start: key.start,
            end: position,
            back: via.into_iter().collect(),
        };
        let id = ItemId::from_push(&mut self.items, item);
        let set = &mut self.sets[position];
        set.items.push(id);
        set.index.insert(key, id);
        (id, true)
    }

    fn advanced_key(&self, id: ItemId) -> ItemKey {
        let item = &self.items[id];
        ItemKey {
            rule: item.rule,
            dot: item.dot + 1,
            start: item.start,
        }
    }
}

pub struct EarleyParser<'g> {
    grammar: &'g Grammar,
    rules: Vec<ChartRule>,
    rules_by_var: HashMap<Var, Vec<usize>>,
}

impl<'g> EarleyParser<'g> {
    pub fn new(grammar: &'g Grammar) -> EarleyParser<'g> {
        let mut rules = vec![ChartRule {
            head: Head::Augmented,
            rhs: vec![Symbol::Nonterminal(grammar.start_symbol())],
        }];
        let mut rules_by_var: HashMap<Var, Vec<usize>> = HashMap::new();

        for production in grammar.productions() {
            let var = production.nonterminal();
            let rule = ChartRule {
                head: Head::Var(var),
                rhs: production.rhs().to_vec(),
            };
            if rules.contains(&rule) {
                continue;
            }
            rules_by_var.entry(var).or_default().push(rules.len());
            rules.push(rule);
        }

        EarleyParser {
            grammar,
            rules,
            rules_by_var,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    fn next_symbol(&self, item: &EarleyItem) -> Option<Symbol> {
        self.rules[item.rule].rhs.get(item.dot).copied()
    }

    fn is_complete(&self, item: &EarleyItem) -> bool {
        item.dot >= self.rules[item.rule].rhs.len()
    }

    pub fn parse(&self, input: &str) -> ParseResult {
        let tokens: Vec<char> = input.chars().collect();
        let n = tokens.len();

        let mut chart = ChartBuilder {
            sets: vec![EarleySet::default(); n + 1],
            items: Vec::new(),
        };
        let seed = ItemKey {
            rule: AUGMENTED_RULE,
            dot: 0,
            start: 0,
        };
        chart.add(0, seed, None);

        for i in 0..=n {
            trace!("=== position {} ===", i);
            // the set grows while we walk it, closure is reached when the
            // cursor catches up with the end
            let mut cursor = 0;
            while cursor < chart.sets[i].items.len() {
                let id = chart.sets[i].items[cursor];
                cursor += 1;

                match self.next_symbol(&chart.items[id]) {
                    Some(Symbol::Nonterminal(b)) => self.predict(&mut chart, i, id, b),
                    Some(Symbol::Terminal(a)) => {
                        if tokens.get(i) == Some(&a) {
                            self.scan(&mut chart, i, id, a);
                        }
                    }
                    None => self.complete(&mut chart, i, id),
                }
            }
        }

        let accept_key = ItemKey {
            rule: AUGMENTED_RULE,
            dot: 1,
            start: 0,
        };
        let accepting = chart.sets[n].index.get(&accept_key).copied();

        let furthest_index = (0..=n)
            .rev()
            .find(|i| chart.sets[*i].items.iter().any(|id| chart.items[*id].dot > 0))
            .unwrap_or(0);

        debug!(
            "earley: {} items over {} positions, accepted: {}, furthest index: {}",
            chart.items.len(),
            n + 1,
            accepting.is_some(),
            furthest_index
        );

        ParseResult {
            accepted: accepting.is_some(),
            furthest_index,
            input: tokens,
            start: self.grammar.start_symbol(),
            symbols: self.grammar.symbols().clone(),
            rules: self.rules.clone(),
            items: chart.items,
            chart: chart.sets,
            accepting,
        }
    }

    fn predict(&self, chart: &mut ChartBuilder, i: usize, id: ItemId, b: Var) {
        for rule in self.rules_by_var.get(&b).into_iter().flatten() {
            let key = ItemKey {
                rule: *rule,
                dot: 0,
                start: i,
            };
            let (predicted, inserted) = chart.add(i, key, None);
            if inserted {
                trace!("predict {}", describe(&self.rules, &chart.items[predicted], self.grammar.start_symbol()));
            }
        }

        // `b` may already have been completed over an empty span at this
        // position before `id` showed up waiting for it
        let nullable_done: Vec<ItemId> = chart.sets[i]
            .items
            .iter()
            .copied()
            .filter(|c| {
                let item = &chart.items[*c];
                item.start == i && self.is_complete(item) && self.rules[item.rule].head == Head::Var(b)
            })
            .collect();

        for right in nullable_done {
            let key = chart.advanced_key(id);
            let bp = BackPointer::Complete {
                left: id,
                right,
                at: i,
            };
            let (advanced, inserted) = chart.add(i, key, Some(bp));
            if inserted {
                trace!("complete (nullable) {}", describe(&self.rules, &chart.items[advanced], self.grammar.start_symbol()));
            }
        }
    }

    fn scan(&self, chart: &mut ChartBuilder, i: usize, id: ItemId, a: char) {
        let key = chart.advanced_key(id);
        let bp = BackPointer::Scan {
            prev: id,
            terminal: a,
            at: i,
        };
        let (advanced, inserted) = chart.add(i + 1, key, Some(bp));
        if inserted {
            trace!("scan {}", describe(&self.rules, &chart.items[advanced], self.grammar.start_symbol()));
        }
    }

    fn complete(&self, chart: &mut ChartBuilder, i: usize, id: ItemId) {
        let (head, start) = {
            let item = &chart.items[id];
            (self.rules[item.rule].head, item.start)
        };
        // nothing ever waits for the augmented start
        let Head::Var(b) = head else {
            return;
        };

        // when start == i this set is the one being extended
        let mut k = 0;
        while k < chart.sets[start].items.len() {
            let left = chart.sets[start].items[k];
            k += 1;

            if self.next_symbol(&chart.items[left]) != Some(Symbol::Nonterminal(b)) {
                continue;
            }

            let key = chart.advanced_key(left);
            let bp = BackPointer::Complete {
                left,
                right: id,
                at: i,
            };
            let (advanced, inserted) = chart.add(i, key, Some(bp));
            if inserted {
                trace!("complete {}", describe(&self.rules, &chart.items[advanced], self.grammar.start_symbol()));
            }
        }
    }
}

fn describe(rules: &[ChartRule], item: &EarleyItem, start: Var) -> String {
    let rule = &rules[item.rule];
    let lhs = match rule.head {
        Head::Augmented => format!("{}'", start),
        Head::Var(v) => v.to_string(),
    };
    let pre: String = rule.rhs[..item.dot].iter().map(|s| s.as_char()).collect();
    let post: String = rule.rhs[item.dot..].iter().map(|s| s.as_char()).collect();
    format!("{} → {}·{}, {}", lhs, pre, post, item.start)
}

/// Everything the parser built for one input. Immutable once returned.
#[derive(Clone, Debug)]
pub struct ParseResult {
    pub accepted: bool,
    /// rightmost position where some item made progress; diagnostics only
    pub furthest_index: usize,
    input: Vec<char>,
    start: Var,
    symbols: GrammarSymbols,
    rules: Vec<ChartRule>,
    items: Vec<EarleyItem>,
    chart: Vec<EarleySet>,
    accepting: Option<ItemId>,
}

impl ParseResult {
    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn start_symbol(&self) -> Var {
        self.start
    }

    pub fn symbols(&self) -> &GrammarSymbols {
        &self.symbols
    }

    pub fn chart(&self) -> &[EarleySet] {
        &self.chart
    }

    pub fn items(&self) -> &[EarleyItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> &EarleyItem {
        &self.items[id]
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn rule(&self, id: ItemId) -> &ChartRule {
        &self.rules[self.items[id].rule]
    }

    pub fn lhs(&self, id: ItemId) -> Head {
        self.rule(id).head
    }

    pub fn rhs(&self, id: ItemId) -> &[Symbol] {
        &self.rule(id).rhs
    }

    pub fn is_complete(&self, id: ItemId) -> bool {
        self.items[id].dot >= self.rule(id).rhs.len()
    }

    /// The `S' → S ·` item spanning the whole input, if the input was accepted.
    pub fn accepting_item(&self) -> Option<ItemId> {
        self.accepting
    }

    /// `A → α·β, j`
    pub fn describe(&self, id: ItemId) -> String {
        describe(&self.rules, &self.items[id], self.start)
    }
}
