//! Tokenizer and proximity-window matcher.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::{find_term_positions, Lexicon, TermHit};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Lowercased words in source order. Whitespace and punctuation, including
/// apostrophes and hyphens, separate words: `alien's` is `alien`, `s`.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The tightest migration/labour pair in a token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairMatch<'a> {
    pub migration: TermHit<'a>,
    pub labour: TermHit<'a>,
    pub distance: usize,
}

/// Closest pair between two index-ordered hit lists. Linear merge.
pub fn closest_pair<'a>(migration: &[TermHit<'a>], labour: &[TermHit<'a>]) -> Option<PairMatch<'a>> {
    let (mut i, mut j) = (0, 0);
    let mut best: Option<PairMatch<'a>> = None;
    while i < migration.len() && j < labour.len() {
        let (m, l) = (migration[i], labour[j]);
        let distance = m.index.abs_diff(l.index);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(PairMatch {
                migration: m,
                labour: l,
                distance,
            });
        }
        if m.index < l.index {
            i += 1;
        } else {
            j += 1;
        }
    }
    best
}

/// The tightest qualifying pair, if its distance is within `window` (inclusive).
pub fn find_qualifying_pair<'a>(
    tokens: &[String],
    lexicon: &'a Lexicon,
    window: usize,
) -> Option<PairMatch<'a>> {
    let migration = find_term_positions(tokens, &lexicon.migration);
    if migration.is_empty() {
        return None;
    }
    let labour = find_term_positions(tokens, &lexicon.labour);
    closest_pair(&migration, &labour).filter(|p| p.distance <= window)
}

/// True iff some migration term and some labour term start within `window` words.
pub fn has_qualifying_pair(tokens: &[String], lexicon: &Lexicon, window: usize) -> bool {
    find_qualifying_pair(tokens, lexicon, window).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::TermSet;

    fn lexicon() -> Lexicon {
        Lexicon::new(
            TermSet::from_terms(["alien(s)", "immigration"]),
            TermSet::from_terms(["wage(s)", "labour market"]),
        )
    }

    /// `filler` neutral words between a migration term and a labour term.
    fn planted(gap: usize, migration_first: bool) -> Vec<String> {
        let mut tokens = vec!["the".to_string(); 3];
        let (a, b) = if migration_first {
            ("aliens", "wages")
        } else {
            ("wages", "aliens")
        };
        tokens.push(a.to_string());
        tokens.extend(std::iter::repeat("filler".to_string()).take(gap.saturating_sub(1)));
        tokens.push(b.to_string());
        tokens.extend(vec!["end".to_string(); 3]);
        tokens
    }

    #[test]
    fn window_boundary_is_inclusive_and_symmetric() {
        let lex = lexicon();
        for window in [1usize, 5, 40] {
            for migration_first in [true, false] {
                assert!(
                    has_qualifying_pair(&planted(window, migration_first), &lex, window),
                    "distance == window should match (window={window})"
                );
                assert!(
                    !has_qualifying_pair(&planted(window + 1, migration_first), &lex, window),
                    "distance == window + 1 should not match (window={window})"
                );
            }
        }
    }

    #[test]
    fn matches_iff_some_pair_within_window() {
        let lex = lexicon();
        // Brute-force oracle over a handful of layouts.
        let layouts: &[&[usize]] = &[&[0, 50], &[0, 45, 90], &[10, 100, 135]];
        for layout in layouts {
            let mut tokens = vec!["x".to_string(); 140];
            let mut migration = Vec::new();
            let mut labour = Vec::new();
            for (n, &pos) in layout.iter().enumerate() {
                if n % 2 == 0 {
                    tokens[pos] = "aliens".into();
                    migration.push(pos);
                } else {
                    tokens[pos] = "wages".into();
                    labour.push(pos);
                }
            }
            for window in [10usize, 35, 40, 45, 50] {
                let expected = migration
                    .iter()
                    .any(|i| labour.iter().any(|j| i.abs_diff(*j) <= window));
                assert_eq!(
                    has_qualifying_pair(&tokens, &lex, window),
                    expected,
                    "layout={layout:?} window={window}"
                );
            }
        }
    }

    #[test]
    fn substrings_do_not_count() {
        let lex = lexicon();
        let tokens = tokenize("The alienation of wageless men");
        assert!(!has_qualifying_pair(&tokens, &lex, 40));
    }

    #[test]
    fn phrase_matches_at_start_index() {
        let lex = lexicon();
        let tokens = tokenize("immigration one two labour market");
        let pair = find_qualifying_pair(&tokens, &lex, 3).unwrap();
        assert_eq!(pair.distance, 3);
        assert_eq!(pair.labour.term, "labour market");
        assert!(find_qualifying_pair(&tokens, &lex, 2).is_none());
    }

    #[test]
    fn closest_pair_is_reported() {
        let lex = lexicon();
        let tokens = tokenize("aliens a b c d wages e aliens f wages");
        let pair = find_qualifying_pair(&tokens, &lex, 40).unwrap();
        assert_eq!(pair.distance, 1);
    }

    #[test]
    fn apostrophes_and_hyphens_split_words() {
        assert_eq!(
            tokenize("Man-power, the aliens' \"jobs\"! The alien’s pay"),
            vec!["man", "power", "the", "aliens", "jobs", "the", "alien", "s", "pay"]
        );
    }

    #[test]
    fn possessive_and_hyphenated_terms_qualify() {
        let lex = Lexicon::builtin();
        for text in [
            "the alien's wages are low",
            "the immigrant's labour is cheap",
            "anti-alien agitation over wages",
            "the foreigner’s man-power",
            "aliens have taken the workers of Stepney",
            "foreign workers were employed at the mill",
        ] {
            assert!(has_qualifying_pair(&tokenize(text), &lex, 40), "{text:?}");
        }
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("  a\n\tb   c \r\n"), "a b c");
    }
}
