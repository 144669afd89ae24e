//! Quote assembly and duplicate suppression.

use std::collections::HashSet;

use chrono::NaiveDate;
use hansard_common::{DebateRef, DedupKey, QuoteCandidate, SpeechRecord};

use crate::lexicon::Lexicon;
use crate::matcher::{find_qualifying_pair, normalize_whitespace, tokenize};

/// Turns speech records into quote candidates. Most speeches are discarded here.
pub struct Assembler {
    lexicon: Lexicon,
    window: usize,
    base_url: String,
}

impl Assembler {
    pub fn new(lexicon: Lexicon, window: usize, base_url: &str) -> Self {
        Self {
            lexicon,
            window,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// A candidate if the speech carries a migration/labour pair within the window.
    pub fn assemble(
        &self,
        date: NaiveDate,
        debate: &DebateRef,
        speech: &SpeechRecord,
    ) -> Option<QuoteCandidate> {
        let tokens = tokenize(&speech.text);
        let pair = find_qualifying_pair(&tokens, &self.lexicon, self.window)?;
        tracing::trace!(
            member = speech.member.as_str(),
            migration = pair.migration.term,
            labour = pair.labour.term,
            distance = pair.distance,
            "Qualifying pair"
        );

        Some(QuoteCandidate {
            date,
            house: speech.house,
            debate_title: speech.debate_title.clone(),
            member: speech.member.clone(),
            party: speech.party.clone(),
            quote: normalize_whitespace(&speech.text),
            hansard_url: hansard_client::hansard_url(&self.base_url, &debate.href),
            json_url: hansard_client::json_url(&self.base_url, &debate.href),
        })
    }
}

/// In-memory set of seen dedup fingerprints, scoped to the whole corpus.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fingerprints<I: IntoIterator<Item = String>>(fingerprints: I) -> Self {
        Self {
            seen: fingerprints.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains(&key.fingerprint())
    }

    /// True if the key is new (and now recorded); false for a duplicate.
    pub fn check_and_insert(&mut self, key: &DedupKey) -> bool {
        self.seen.insert(key.fingerprint())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
