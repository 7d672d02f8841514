//! leaderboard-ocr
//!
//! スクリーンショットのOCRテキストからリーダーボードを再構成する。
//! 集計ロジックは `leaderboard_common`、こちらは設定・OCR・キュー・対話セッション。

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod ocr;
pub mod queue;
pub mod scanner;
pub mod session;

pub use error::{LeaderboardError, Result};
