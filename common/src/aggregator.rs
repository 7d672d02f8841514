//! スコア集計
//!
//! バッチ内の全候補を正規名で束ね、1プレイヤー1行のランキングにする。
//!
//! 重なったスクリーンショットには同じ行が何度も写るため、同一プレイヤーの
//! スコアは合算せず、観測された最大値だけを採用する。

use crate::canonicalizer::Canonicalizer;
use crate::parser::parse_score;
use crate::types::{AggregatedEntry, CanonicalDetection, RawDetection, ScalarTotals};
use log::debug;
use std::collections::HashMap;

/// 表示件数の既定値
pub const DEFAULT_CAP: usize = 20;

/// 集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<AggregatedEntry>,
    totals: ScalarTotals,
    dropped: usize,
}

impl Leaderboard {
    /// 全エントリ（表示上限なし）
    pub fn entries(&self) -> &[AggregatedEntry] {
        &self.entries
    }

    /// 上位 `cap` 件
    pub fn top(&self, cap: usize) -> &[AggregatedEntry] {
        &self.entries[..self.entries.len().min(cap)]
    }

    pub fn totals(&self) -> &ScalarTotals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 照合できずに捨てた候補数
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// プレイヤースコアの合計（全件）
    pub fn player_sum(&self) -> u64 {
        self.entries.iter().map(|e| e.score).sum()
    }

    /// 合計ダメージとの差（`合計 - プレイヤー合計`）
    ///
    /// 負になる場合は桁の誤読か別プレイヤーへの誤帰属が疑われる。
    pub fn unaccounted_damage(&self) -> Option<i128> {
        self.totals
            .total_damage
            .map(|total| total as i128 - self.player_sum() as i128)
    }
}

/// 候補を正規名に解決（照合できないもの・スコアが読めないものは捨てる）
pub fn canonicalize_detections(
    raw: &[RawDetection],
    canonicalizer: &Canonicalizer,
) -> Vec<CanonicalDetection> {
    raw.iter()
        .filter_map(|detection| {
            let score = parse_score(&detection.raw_score_text)?;
            let identity = canonicalizer.canonicalize(&detection.raw_name)?;
            Some(CanonicalDetection {
                identity,
                score,
                source_block: detection.source_block,
            })
        })
        .collect()
}

/// 正規化済みの検出をランキングにまとめる
///
/// - 同一プレイヤーは最大値
/// - スコア降順、同点は最初に解決された順
pub fn aggregate(detections: &[CanonicalDetection], totals: ScalarTotals) -> Leaderboard {
    let mut order: Vec<(&str, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for detection in detections {
        match index.get(detection.identity.as_str()) {
            Some(&i) => order[i].1 = order[i].1.max(detection.score),
            None => {
                index.insert(detection.identity.as_str(), order.len());
                order.push((detection.identity.as_str(), detection.score));
            }
        }
    }

    // 安定ソートなので同点は初出順のまま
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let entries = order
        .into_iter()
        .enumerate()
        .map(|(i, (identity, score))| AggregatedEntry {
            identity: identity.to_string(),
            score,
            rank: i + 1,
        })
        .collect();

    Leaderboard {
        entries,
        totals,
        dropped: 0,
    }
}

/// 生の候補から照合・集計までを一括で行う
pub fn reconcile(
    raw: &[RawDetection],
    totals: ScalarTotals,
    canonicalizer: &Canonicalizer,
) -> Leaderboard {
    let resolved = canonicalize_detections(raw, canonicalizer);
    let dropped = raw.len() - resolved.len();
    if dropped > 0 {
        debug!("照合できなかった候補: {}件", dropped);
    }

    Leaderboard {
        dropped,
        ..aggregate(&resolved, totals)
    }
}
