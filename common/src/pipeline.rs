//! パース → 照合 → 集計 → 整形 の一括処理
//!
//! キューの解析ループと対話セッションはどちらもここを通る。

use crate::aggregator::{reconcile, Leaderboard};
use crate::canonicalizer::Canonicalizer;
use crate::formatter::{render, ReportOptions};
use crate::parser::parse_batch;
use log::{debug, warn};

/// 1バッチ分の処理結果
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub board: Leaderboard,
    pub report: String,
    /// パースで得た候補数（照合前）
    pub detections: usize,
    pub block_count: usize,
}

/// 照合器と整形オプションを束ねた処理器
#[derive(Debug, Clone)]
pub struct Reconciler {
    canonicalizer: Canonicalizer,
    options: ReportOptions,
}

impl Reconciler {
    pub fn new(canonicalizer: Canonicalizer, options: ReportOptions) -> Self {
        Self {
            canonicalizer,
            options,
        }
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// OCRテキストのブロック列（1画像 = 1ブロック）からレポートを作る
    pub fn run<S: AsRef<str>>(&self, blocks: &[S]) -> Reconciliation {
        let batch = parse_batch(blocks);
        let board = reconcile(&batch.detections, batch.totals, &self.canonicalizer);

        debug!(
            "ブロック {}件 / 候補 {}件 / 採用 {}名 / 破棄 {}件",
            batch.block_count,
            batch.detections.len(),
            board.len(),
            board.dropped()
        );

        if let Some(diff) = board.unaccounted_damage() {
            if diff < 0 {
                warn!(
                    "プレイヤー合計が合計ダメージを {} 上回っています（誤読の可能性）",
                    -diff
                );
            }
        }

        let report = render(&board, &self.options);

        Reconciliation {
            board,
            report,
            detections: batch.detections.len(),
            block_count: batch.block_count,
        }
    }
}
