// Read side of the persisted corpus, plus the optional annotation hook.
//
// Downstream consumers (a browsing UI, a relational store) see rows only
// through `Corpus::query` and `Corpus::append`. Annotations land in the
// separate `analysis` field; `quote` is never rewritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hansard_common::{ClassifiedQuote, Frame};
use tracing::warn;

use crate::error::Result;
use crate::writer::{read_jsonl, IncrementalWriter, QUOTES_JSONL};

/// Row filter. Every field is optional; an empty query returns everything.
#[derive(Debug, Clone, Default)]
pub struct CorpusQuery {
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub frame: Option<Frame>,
    /// Case-insensitive substring over quote, member and debate title.
    pub search: Option<String>,
    pub min_confidence: Option<u8>,
    pub limit: Option<usize>,
}

impl CorpusQuery {
    pub fn matches(&self, row: &ClassifiedQuote) -> bool {
        let c = &row.candidate;
        let year = c.year();
        if self.from_year.is_some_and(|y| year < y) || self.to_year.is_some_and(|y| year > y) {
            return false;
        }
        if self.frame.is_some_and(|f| row.frame != f) {
            return false;
        }
        if self.min_confidence.is_some_and(|m| row.confidence < m) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&c.quote, &c.member, &c.debate_title]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

pub struct Corpus {
    dir: PathBuf,
}

impl Corpus {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn rows(&self) -> Result<Vec<ClassifiedQuote>> {
        read_jsonl(&self.dir.join(QUOTES_JSONL))
    }

    /// Matching rows, highest confidence first; ties keep file order.
    pub fn query(&self, query: &CorpusQuery) -> Result<Vec<ClassifiedQuote>> {
        let mut rows: Vec<ClassifiedQuote> = self
            .rows()?
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();
        rows.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Write accessor for rows classified elsewhere.
    pub fn append(&self, rows: &[ClassifiedQuote]) -> Result<usize> {
        let mut writer = IncrementalWriter::open(&self.dir)?;
        for row in rows {
            writer.append(row)?;
        }
        Ok(rows.len())
    }
}

/// Produces a short note for a quote. Implementations may call out to
/// anything; failures are swallowed by [`annotate`].
#[async_trait]
pub trait QuoteAnnotator: Send + Sync {
    async fn annotate(&self, row: &ClassifiedQuote) -> anyhow::Result<Option<String>>;
}

/// Run `annotator` over `rows`, failing closed: an error or blank note yields `None`.
pub async fn annotate(
    rows: Vec<ClassifiedQuote>,
    annotator: &dyn QuoteAnnotator,
) -> Vec<(ClassifiedQuote, Option<String>)> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let note = match annotator.annotate(&row).await {
            Ok(Some(note)) if !note.trim().is_empty() => Some(note.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(member = row.candidate.member.as_str(), error = %e, "Annotation failed");
                None
            }
        };
        out.push((row, note));
    }
    out
}

/// Copy each note into its row's `analysis` field.
pub fn with_analysis(annotated: Vec<(ClassifiedQuote, Option<String>)>) -> Vec<ClassifiedQuote> {
    annotated
        .into_iter()
        .map(|(mut row, note)| {
            if note.is_some() {
                row.analysis = note;
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hansard_common::{House, QuoteCandidate};

    fn row(year: i32, member: &str, quote: &str, frame: Frame, confidence: u8) -> ClassifiedQuote {
        ClassifiedQuote::new(
            QuoteCandidate {
                date: NaiveDate::from_ymd_opt(year, 3, 1).unwrap(),
                house: House::Commons,
                debate_title: "ALIENS".into(),
                member: member.into(),
                party: None,
                quote: quote.into(),
                hansard_url: format!("https://x/{member}"),
                json_url: format!("https://x/{member}.js"),
            },
            frame,
            confidence,
        )
    }

    fn corpus_with(rows: &[ClassifiedQuote]) -> (tempfile::TempDir, Corpus) {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::new(dir.path());
        corpus.append(rows).unwrap();
        (dir, corpus)
    }

    #[test]
    fn query_filters_and_sorts_by_confidence() {
        let (_dir, corpus) = corpus_with(&[
            row(1905, "Mr. A", "aliens depress wages", Frame::LabourThreat, 4),
            row(1910, "Mr. B", "shortage of labour, admit aliens", Frame::LabourNeed, 8),
            row(1920, "Mr. C", "aliens take our jobs", Frame::LabourThreat, 9),
            row(1925, "Mr. D", "undesirable aliens and wages", Frame::Mixed, 6),
        ]);

        let all = corpus.query(&CorpusQuery::default()).unwrap();
        let confidences: Vec<u8> = all.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![9, 8, 6, 4]);

        let threat = corpus
            .query(&CorpusQuery {
                frame: Some(Frame::LabourThreat),
                from_year: Some(1900),
                to_year: Some(1915),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(threat.len(), 1);
        assert_eq!(threat[0].candidate.member, "Mr. A");

        let searched = corpus
            .query(&CorpusQuery {
                search: Some("WAGES".into()),
                min_confidence: Some(5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].candidate.member, "Mr. D");

        let limited = corpus
            .query(&CorpusQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    struct ScriptedAnnotator;

    #[async_trait]
    impl QuoteAnnotator for ScriptedAnnotator {
        async fn annotate(&self, row: &ClassifiedQuote) -> anyhow::Result<Option<String>> {
            match row.candidate.member.as_str() {
                "Mr. A" => Ok(Some("  Context on the 1905 Act.  ".into())),
                "Mr. B" => Ok(Some("   ".into())),
                _ => anyhow::bail!("model unavailable"),
            }
        }
    }

    #[tokio::test]
    async fn annotation_fails_closed() {
        let rows = vec![
            row(1905, "Mr. A", "q", Frame::Other, 1),
            row(1905, "Mr. B", "q", Frame::Other, 1),
            row(1905, "Mr. C", "q", Frame::Other, 1),
        ];
        let annotated = annotate(rows.clone(), &ScriptedAnnotator).await;
        let notes: Vec<_> = annotated.iter().map(|(_, n)| n.clone()).collect();
        assert_eq!(
            notes,
            vec![Some("Context on the 1905 Act.".to_string()), None, None]
        );

        let updated = with_analysis(annotated);
        assert_eq!(updated[0].analysis.as_deref(), Some("Context on the 1905 Act."));
        assert_eq!(updated[0].candidate.quote, rows[0].candidate.quote);
        assert!(updated[2].analysis.is_none());
    }
}
