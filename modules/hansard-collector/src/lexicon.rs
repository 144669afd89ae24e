//! Migration and labour term sets.
//!
//! Terms are data: plain words, multi-word phrases, `stem(a|b)` optional
//! suffixes (`immigrant(s)` matches both forms) and `stem*` prefixes.
//! Matching is whole-token, so `alien` never matches inside `alienate`.

use hansard_common::LexiconConfig;
use tracing::warn;

const MIGRATION_TERMS: &[&str] = &[
    "immigration",
    "immigrant(s)",
    "migrant(s)",
    "alien(s)",
    "foreign(er|ers)",
    "guest worker(s)",
    "colonial subjects",
    "colonial workers",
];

const LABOUR_TERMS: &[&str] = &[
    "labour market",
    "labor market",
    "labour",
    "labor",
    "labourer(s)",
    "worker(s)",
    "workmen",
    "wage(s)",
    "pay",
    "employ(ed|er|ers)",
    "employment",
    "unemployment",
    "unemployed",
    "job(s)",
    "workforce",
    "manpower",
    "man power",
    "strike(s)",
    "trade union(s)",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum WordPattern {
    Exact(String),
    /// `stem` alone or followed by one of `suffixes`.
    Suffixed { stem: String, suffixes: Vec<String> },
    Prefix(String),
}

impl WordPattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() {
            return None;
        }
        if let Some(stem) = raw.strip_suffix('*') {
            return (!stem.is_empty()).then(|| WordPattern::Prefix(stem.to_string()));
        }
        if let (Some(open), true) = (raw.find('('), raw.ends_with(')')) {
            let stem = raw[..open].to_string();
            let suffixes = raw[open + 1..raw.len() - 1]
                .split('|')
                .map(str::to_string)
                .filter(|s| !s.is_empty())
                .collect();
            return (!stem.is_empty()).then_some(WordPattern::Suffixed { stem, suffixes });
        }
        Some(WordPattern::Exact(raw))
    }

    fn matches(&self, token: &str) -> bool {
        match self {
            WordPattern::Exact(word) => token == word,
            WordPattern::Prefix(stem) => token.starts_with(stem.as_str()),
            WordPattern::Suffixed { stem, suffixes } => match token.strip_prefix(stem.as_str()) {
                Some("") => true,
                Some(rest) => suffixes.iter().any(|s| s == rest),
                None => false,
            },
        }
    }
}

/// One lexicon entry: a sequence of word patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    words: Vec<WordPattern>,
}

impl Term {
    pub fn parse(raw: &str) -> Option<Self> {
        let words: Vec<WordPattern> = raw
            .split_whitespace()
            .map(WordPattern::parse)
            .collect::<Option<_>>()?;
        if words.is_empty() {
            return None;
        }
        Some(Self {
            text: raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
            words,
        })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    fn matches_at(&self, tokens: &[String], start: usize) -> bool {
        tokens.len() >= start + self.words.len()
            && self
                .words
                .iter()
                .zip(&tokens[start..])
                .all(|(pattern, token)| pattern.matches(token))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermSet {
    terms: Vec<Term>,
}

impl TermSet {
    pub fn from_terms<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<Term> = Vec::new();
        for r in raw {
            match Term::parse(r.as_ref()) {
                Some(term) if !terms.iter().any(|t| t.text == term.text) => terms.push(term),
                Some(_) => {}
                None => warn!(term = r.as_ref(), "Ignoring unparseable lexicon term"),
            }
        }
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn contains_text(&self, text: &str) -> bool {
        self.terms.iter().any(|t| t.text == text)
    }

    /// Longest term starting at `index`, if any.
    fn longest_at(&self, tokens: &[String], index: usize) -> Option<&Term> {
        self.terms
            .iter()
            .filter(|t| t.matches_at(tokens, index))
            .max_by_key(|t| t.word_count())
    }
}

/// A term occurrence. Multi-word terms are reported at their first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermHit<'a> {
    pub index: usize,
    pub term: &'a str,
}

/// Every position in `tokens` where a term from `set` starts, in token order.
/// At most one hit per position: the longest matching term wins.
pub fn find_term_positions<'a>(tokens: &[String], set: &'a TermSet) -> Vec<TermHit<'a>> {
    (0..tokens.len())
        .filter_map(|index| {
            set.longest_at(tokens, index).map(|term| TermHit {
                index,
                term: term.text.as_str(),
            })
        })
        .collect()
}

/// The two disjoint term sets used for proximity matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    pub migration: TermSet,
    pub labour: TermSet,
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self::new(TermSet::from_terms(MIGRATION_TERMS), TermSet::from_terms(LABOUR_TERMS))
    }

    /// Build from two term sets. A term listed in both is kept as a migration term only.
    pub fn new(migration: TermSet, labour: TermSet) -> Self {
        let (kept, dropped): (Vec<Term>, Vec<Term>) = labour
            .terms
            .into_iter()
            .partition(|t| !migration.contains_text(&t.text));
        for term in &dropped {
            warn!(term = term.text.as_str(), "Term listed as both migration and labour; keeping it as migration");
        }
        Self {
            migration,
            labour: TermSet { terms: kept },
        }
    }

    pub fn from_config(config: Option<&LexiconConfig>) -> Self {
        match config {
            Some(c) => Self::new(
                TermSet::from_terms(&c.migration_terms),
                TermSet::from_terms(&c.labour_terms),
            ),
            None => Self::builtin(),
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::tokenize;

    #[test]
    fn suffix_patterns() {
        let set = TermSet::from_terms(["immigrant(s)", "foreign(er|ers)"]);
        let tokens = tokenize("Immigrants, an immigrant, foreigners and foreign goods; immigrantsville");
        let hits: Vec<_> = find_term_positions(&tokens, &set)
            .into_iter()
            .map(|h| (h.index, h.term))
            .collect();
        assert_eq!(
            hits,
            vec![
                (0, "immigrant(s)"),
                (2, "immigrant(s)"),
                (3, "foreign(er|ers)"),
                (5, "foreign(er|ers)"),
            ]
        );
    }

    #[test]
    fn whole_token_only() {
        let set = TermSet::from_terms(["alien(s)", "pay"]);
        let tokens = tokenize("They alienate the payroll clerk");
        assert!(find_term_positions(&tokens, &set).is_empty());
    }

    #[test]
    fn multi_word_terms_hit_at_start_index() {
        let set = TermSet::from_terms(["labour", "labour market"]);
        let tokens = tokenize("the labour market is tight");
        let hits = find_term_positions(&tokens, &set);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[0].term, "labour market");
    }

    #[test]
    fn prefix_patterns() {
        let set = TermSet::from_terms(["unemploy*"]);
        let tokens = tokenize("unemployed men and unemployment");
        assert_eq!(find_term_positions(&tokens, &set).len(), 2);
    }

    #[test]
    fn overlapping_terms_are_removed_from_labour() {
        let lexicon = Lexicon::new(
            TermSet::from_terms(["aliens", "guest workers"]),
            TermSet::from_terms(["wages", "aliens"]),
        );
        assert_eq!(lexicon.labour.len(), 1);
        assert_eq!(lexicon.migration.len(), 2);
    }

    #[test]
    fn guest_workers_stays_a_migration_phrase() {
        let lexicon = Lexicon::builtin();
        let tokens = tokenize("guest workers and workers");
        let migration = find_term_positions(&tokens, &lexicon.migration);
        assert_eq!(migration.len(), 1);
        assert_eq!(migration[0].term, "guest worker(s)");
        let labour: Vec<usize> = find_term_positions(&tokens, &lexicon.labour)
            .iter()
            .map(|h| h.index)
            .collect();
        assert_eq!(labour, vec![1, 3]);
    }

    #[test]
    fn builtin_sets_are_populated() {
        let lexicon = Lexicon::builtin();
        assert!(!lexicon.migration.is_empty());
        assert!(!lexicon.labour.is_empty());
    }
}
