//! Leaderboard OCR Common Library
//!
//! OCRテキストからリーダーボードを組み立てる純粋なロジック。
//! ファイルI/Oやネットワークはルートクレート側で扱う。

pub mod aggregator;
pub mod alias;
pub mod canonicalizer;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod pipeline;
pub mod roster;
pub mod similarity;
pub mod types;

pub use aggregator::{aggregate, canonicalize_detections, reconcile, Leaderboard, DEFAULT_CAP};
pub use alias::{AliasConfig, AliasTable};
pub use canonicalizer::{strip_noise, Canonicalizer, MatchMethod, Resolution, MIN_SIMILARITY};
pub use error::{Error, Result};
pub use formatter::{format_thousands, render, render_entries, ReportOptions, NO_ENTRIES_MESSAGE};
pub use parser::{parse_batch, parse_block, parse_score, ParsedBatch};
pub use pipeline::{Reconciler, Reconciliation};
pub use roster::{detect_script, Roster, RosterEntry, Script};
pub use types::{AggregatedEntry, BlockId, CanonicalDetection, ParsedBlock, RawDetection, ScalarTotals};
