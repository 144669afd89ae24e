pub mod assembler;
pub mod classifier;
pub mod corpus;
pub mod crawler;
pub mod error;
pub mod lexicon;
pub mod matcher;
pub mod sitting;
pub mod state;
pub mod stats;
pub mod tabular;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod walker;
pub mod writer;

pub use assembler::{Assembler, Deduplicator};
pub use classifier::{Classification, Classifier, Signals};
pub use corpus::{annotate, Corpus, CorpusQuery, QuoteAnnotator};
pub use crawler::{CrawlState, Crawler, DayOutcome};
pub use error::StoreError;
pub use lexicon::{find_term_positions, Lexicon, TermSet};
pub use matcher::{has_qualifying_pair, tokenize};
pub use stats::CrawlStats;
pub use traits::HansardSource;
pub use walker::{walk, DebateNode};
pub use writer::IncrementalWriter;
