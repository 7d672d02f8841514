//! プレイヤー名の正規化（照合）
//!
//! OCRで崩れた名前を名簿上の正規名に解決する。先に成功した段で確定する:
//!
//! 1. 完全一致（エイリアス表 → 名簿・エイリアスの写像先）
//! 2. ノイズ除去（同盟タグ、記号、列ずれで混入した先頭の数字など）
//! 3. 除去後の完全一致（エイリアス表 → 名簿）
//! 4. 文字種別の類似度照合（CJKはピンイン化して比較、閾値0.6）
//! 5. 編集距離によるフォールバック（`max(2, 候補長/3)` 以内）
//!
//! どれにも当たらなければ `None`。照合失敗はエラーではない。
//! 名簿とエイリアス表の純関数なので、同じ入力には常に同じ結果を返す。

use crate::alias::AliasTable;
use crate::roster::{contains_cjk, Roster, Script};
use crate::similarity::{edit_distance, romanize, sequence_ratio};
use log::debug;
use regex::Regex;

lazy_static::lazy_static! {
    /// 先頭の同盟タグ `[BLT]` と、その片側が欠けた `BLT]` / `[BLT `
    static ref ALLIANCE_TAG_RE: Regex =
        Regex::new(r"^(\[[^\]]{1,6}\]|[A-Za-z0-9]{2,5}\]|\[[A-Za-z0-9]{2,5}\s)").unwrap();
    /// 列の境界ずれで混入する先頭の順位番号・記号
    static ref NOISE_PREFIX_RE: Regex =
        Regex::new(r"^(o?\d+|[sS]?\d+|il|b=|[%<>=¥]\s*)").unwrap();
    static ref NON_NAME_RE: Regex = Regex::new(r"[^\w\s()]").unwrap();
}

/// 類似度照合の下限
pub const MIN_SIMILARITY: f64 = 0.6;

/// 名前からOCRノイズを除去
pub fn strip_noise(raw: &str) -> String {
    let tagless = ALLIANCE_TAG_RE.replace(raw.trim(), "");
    let symbols_removed = tagless.replace(|c: char| matches!(c, '#' | '|' | '¢' | '@'), "");
    let prefix_removed = NOISE_PREFIX_RE.replace(symbols_removed.trim(), "");
    NON_NAME_RE
        .replace_all(&prefix_removed, "")
        .trim()
        .to_string()
}

/// 確定した段
#[derive(Debug, Clone, PartialEq)]
pub enum MatchMethod {
    Alias,
    Exact,
    Similarity(f64),
    EditDistance(usize),
}

/// 照合結果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub identity: String,
    pub method: MatchMethod,
}

/// 名簿とエイリアス表を束ねた不変の照合器
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    roster: Roster,
    aliases: AliasTable,
    /// (名簿インデックス, ピンイン) ※CJK名のみ
    romanized: Vec<(usize, String)>,
    min_similarity: f64,
}

impl Canonicalizer {
    pub fn new(roster: Roster, aliases: AliasTable) -> Self {
        let romanized = roster
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.script == Script::Cjk)
            .map(|(i, e)| (i, romanize(&e.canonical_name)))
            .collect();

        Self {
            roster,
            aliases,
            romanized,
            min_similarity: MIN_SIMILARITY,
        }
    }

    /// 類似度の下限を変更
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// 正規名を返す（照合できなければ `None`）
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        self.resolve(raw).map(|r| r.identity)
    }

    /// 照合の詳細付きで解決
    pub fn resolve(&self, raw: &str) -> Option<Resolution> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(resolution) = self.exact(trimmed) {
            return Some(resolution);
        }

        let cleaned = strip_noise(trimmed);
        if cleaned.is_empty() {
            debug!("照合不可（ノイズのみ）: {:?}", raw);
            return None;
        }

        if let Some(resolution) = self.exact(&cleaned) {
            return Some(resolution);
        }

        let resolution = self
            .similar(&cleaned)
            .or_else(|| self.nearest_by_edit_distance(&cleaned));

        match &resolution {
            Some(r) => debug!("照合: {:?} → {} ({:?})", raw, r.identity, r.method),
            None => debug!("照合失敗: {:?}", raw),
        }

        resolution
    }

    /// エイリアス表 → 名簿（およびエイリアスの写像先）の完全一致
    fn exact(&self, name: &str) -> Option<Resolution> {
        if let Some(target) = self.aliases.lookup(name) {
            return Some(Resolution {
                identity: target.to_string(),
                method: MatchMethod::Alias,
            });
        }

        if self.roster.contains(name) || self.aliases.is_target(name) {
            return Some(Resolution {
                identity: name.to_string(),
                method: MatchMethod::Exact,
            });
        }

        None
    }

    /// 文字種別の類似度照合（最高値を採用、同点は名簿順で先のもの）
    fn similar(&self, cleaned: &str) -> Option<Resolution> {
        let mut best: Option<(&str, f64)> = None;

        if contains_cjk(cleaned) {
            let query = romanize(cleaned);
            for (index, candidate) in &self.romanized {
                let ratio = sequence_ratio(&query, candidate);
                if best.map_or(true, |(_, b)| ratio > b) {
                    best = Some((self.roster.entries()[*index].canonical_name.as_str(), ratio));
                }
            }
        } else {
            for entry in self.roster.partition(Script::Latin) {
                let ratio = sequence_ratio(cleaned, &entry.canonical_name);
                if best.map_or(true, |(_, b)| ratio > b) {
                    best = Some((entry.canonical_name.as_str(), ratio));
                }
            }
        }

        let (name, ratio) = best?;
        if ratio < self.min_similarity {
            return None;
        }

        Some(Resolution {
            identity: self.finalize(name),
            method: MatchMethod::Similarity(ratio),
        })
    }

    /// 編集距離フォールバック（大文字小文字は無視）
    fn nearest_by_edit_distance(&self, cleaned: &str) -> Option<Resolution> {
        let script = if contains_cjk(cleaned) {
            Script::Cjk
        } else {
            Script::Latin
        };
        let query = cleaned.to_lowercase();

        let mut best: Option<(&str, usize)> = None;
        for entry in self.roster.partition(script) {
            let candidate = entry.canonical_name.as_str();
            let distance = edit_distance(&query, &candidate.to_lowercase());
            let limit = 2.max(candidate.chars().count() / 3);

            if distance <= limit && best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate, distance));
            }
        }

        let (name, distance) = best?;
        Some(Resolution {
            identity: self.finalize(name),
            method: MatchMethod::EditDistance(distance),
        })
    }

    /// 名簿名自体がエイリアス登録されていれば写像先に寄せる
    fn finalize(&self, roster_name: &str) -> String {
        self.aliases
            .lookup(roster_name)
            .unwrap_or(roster_name)
            .to_string()
    }
}
