use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of leading quote characters that participate in the dedup key.
pub const DEDUP_PREFIX_CHARS: usize = 80;

// --- Houses and debate references ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum House {
    Commons,
    Lords,
}

impl House {
    pub fn as_str(&self) -> &'static str {
        match self {
            House::Commons => "commons",
            House::Lords => "lords",
        }
    }

    /// Derive the house from a debate path such as `/commons/1905/aug/10/aliens-bill`.
    /// Only whole path segments count, so `/lordship/...` is not a match.
    pub fn from_href(href: &str) -> Option<House> {
        href.split('/').find_map(|segment| match segment {
            "commons" => Some(House::Commons),
            "lords" => Some(House::Lords),
            _ => None,
        })
    }

    /// Map a sitting-index key (`house_of_commons_sitting`) to a house.
    pub fn from_sitting_key(key: &str) -> Option<House> {
        match key {
            "house_of_commons_sitting" => Some(House::Commons),
            "house_of_lords_sitting" => Some(House::Lords),
            _ => None,
        }
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One debate listed in a day's sitting index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateRef {
    pub date: NaiveDate,
    pub house: House,
    pub href: String,
    pub title: String,
}

/// A single utterance flattened out of a debate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRecord {
    pub house: House,
    pub debate_title: String,
    pub member: String,
    pub party: Option<String>,
    pub text: String,
}

// --- Quotes ---

/// A speech whose text carries a qualifying migration/labour term pair.
/// `quote` is the source text with whitespace collapsed; nothing else is altered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCandidate {
    pub date: NaiveDate,
    pub house: House,
    pub debate_title: String,
    pub member: String,
    #[serde(default)]
    pub party: Option<String>,
    pub quote: String,
    pub hansard_url: String,
    pub json_url: String,
}

impl QuoteCandidate {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.hansard_url, &self.member, &self.quote)
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frame {
    LabourNeed,
    LabourThreat,
    Racialised,
    Mixed,
    Other,
}

impl Frame {
    pub const ALL: [Frame; 5] = [
        Frame::LabourNeed,
        Frame::LabourThreat,
        Frame::Racialised,
        Frame::Mixed,
        Frame::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::LabourNeed => "LABOUR_NEED",
            Frame::LabourThreat => "LABOUR_THREAT",
            Frame::Racialised => "RACIALISED",
            Frame::Mixed => "MIXED",
            Frame::Other => "OTHER",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Frame::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| format!("unknown frame: {s}"))
    }
}

/// A quote plus its frame label and 0-10 confidence. Written once, never mutated;
/// later passes add `analysis` alongside instead of touching `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedQuote {
    #[serde(flatten)]
    pub candidate: QuoteCandidate,
    pub frame: Frame,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl ClassifiedQuote {
    pub fn new(candidate: QuoteCandidate, frame: Frame, confidence: u8) -> Self {
        Self {
            candidate,
            frame,
            confidence: confidence.min(10),
            analysis: None,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        self.candidate.dedup_key()
    }
}

// --- Dedup ---

/// Identity of a quote for duplicate suppression: source page, speaker, and the
/// first 80 characters of the quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub hansard_url: String,
    pub member: String,
    pub quote_prefix: String,
}

impl DedupKey {
    pub fn new(hansard_url: &str, member: &str, quote: &str) -> Self {
        Self {
            hansard_url: hansard_url.to_string(),
            member: member.to_string(),
            quote_prefix: quote.chars().take(DEDUP_PREFIX_CHARS).collect(),
        }
    }

    /// Stable SHA-256 hex digest used for the persisted key store.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.hansard_url.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.member.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.quote_prefix.as_bytes());
        hex::encode(hasher.finalize())
    }
}
