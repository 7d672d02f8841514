//! 照合パイプラインの型定義
//!
//! - RawDetection: 行パーサーの出力（未照合の名前とスコア文字列）
//! - CanonicalDetection: 名簿照合に成功した検出
//! - ScalarTotals: 同盟合計ダメージ・ラリー回数
//! - AggregatedEntry: 集計後の順位付きエントリ

use serde::{Deserialize, Serialize};

/// バッチ内でのOCRブロック番号（投入順）
pub type BlockId = usize;

/// 行パーサーが抽出した生の候補
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub raw_name: String,
    pub raw_score_text: String,
    pub source_block: BlockId,
}

/// 名簿上の正規名に解決された検出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDetection {
    pub identity: String,
    pub score: u64,
    pub source_block: BlockId,
}

/// ブロック単位のスカラー値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarTotals {
    #[serde(default)]
    pub total_damage: Option<u64>,
    #[serde(default)]
    pub rally_count: Option<u32>,
}

impl ScalarTotals {
    /// 後から見えた値で上書き（同一リーダーボードなら値は一致する前提）
    pub fn absorb(&mut self, other: &ScalarTotals) {
        if other.total_damage.is_some() {
            self.total_damage = other.total_damage;
        }
        if other.rally_count.is_some() {
            self.rally_count = other.rally_count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_damage.is_none() && self.rally_count.is_none()
    }
}

/// 1ブロック分のパース結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBlock {
    pub detections: Vec<RawDetection>,
    pub totals: ScalarTotals,
}

/// 集計済みエントリ（1プレイヤー1件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedEntry {
    pub identity: String,
    pub score: u64,
    /// 1始まりの順位
    pub rank: usize,
}
