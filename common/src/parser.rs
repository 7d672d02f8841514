//! OCRテキストの行パーサー
//!
//! リーダーボードのスクリーンショット1枚分のテキストを行単位で走査し、
//! (名前, スコア文字列) の候補と合計ダメージ・ラリー回数を抽出する。
//!
//! 対応する行の形式:
//! ```text
//! Total Alliance Damage: 1,234,567,890
//! Rallies: 12
//! FictionAddict                     <- 名前だけの行（次の行で使う）
//! Damage Points: 467,388,307
//! PEiPEi Damage Points: 500,000,000 <- 名前とスコアが同じ行
//! ```
//!
//! 壊れた行・読めない数値は黙って捨てる。エラーにはしない。

use crate::canonicalizer::strip_noise;
use crate::types::{BlockId, ParsedBlock, RawDetection, ScalarTotals};
use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// 「Damage Points」見出し（`Damage|Points` `DamagePoints` などの崩れも許容）
    static ref DAMAGE_HEADER_RE: Regex =
        Regex::new(r"(?i)damage\s*\|?\s*points\s*:?").unwrap();
    static ref TOTAL_DAMAGE_RE: Regex =
        Regex::new(r"(?i)total\s*(alliance\s*)?damage").unwrap();
    static ref RALLY_RE: Regex = Regex::new(r"(?i)\brall(y|ies)\b").unwrap();
    /// 合計ダメージ用の長い数値列（`,` `.` 空白区切り）
    static ref LONG_NUMBER_RE: Regex = Regex::new(r"\d[\d,.\s]{5,}").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"\d+").unwrap();
}

/// バッチ全体のパース結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    pub detections: Vec<RawDetection>,
    pub totals: ScalarTotals,
    /// 入力ブロック数（空ブロックも含む）
    pub block_count: usize,
}

/// 区切り文字を除いて整数化（`1,234,567` → 1234567）
///
/// `,` `.` と空白を除去し、`O` を `0` とみなした上で数字だけが残る場合のみ成功。
pub fn parse_score(text: &str) -> Option<u64> {
    let trimmed = text.trim_start_matches(|c: char| c == ':' || c == '|' || c.is_whitespace());

    let normalized: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '.') && !c.is_whitespace())
        .map(|c| if c == 'O' { '0' } else { c })
        .collect();

    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    normalized.parse().ok()
}

/// 1ブロックをパース（ブロック内の重複行は除去）
pub fn parse_block(text: &str, block: BlockId) -> ParsedBlock {
    let mut seen = HashSet::new();
    parse_lines(&unseen_lines(text, &mut seen), block)
}

/// 複数ブロックをまとめてパース
///
/// 同じ画面の枠が二重に読まれることがあるため、ブロックをまたいで
/// 完全一致する行は最初の1回だけ採用する。保留中の名前はブロック境界で破棄する。
///
/// 名前だけの行は重複していても残し、後続のスコア行と組にする。
pub fn parse_batch<S: AsRef<str>>(blocks: &[S]) -> ParsedBatch {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut batch = ParsedBatch {
        block_count: blocks.len(),
        ..Default::default()
    };

    for (block, text) in blocks.iter().enumerate() {
        let lines = unseen_lines(text.as_ref(), &mut seen);
        let parsed = parse_lines(&lines, block);
        batch.detections.extend(parsed.detections);
        batch.totals.absorb(&parsed.totals);
    }

    batch
}

/// 未出の行（名前だけの行は既出でも通す）
fn unseen_lines<'a>(text: &'a str, seen: &mut HashSet<&'a str>) -> Vec<&'a str> {
    meaningful_lines(text)
        .filter(|line| seen.insert(*line) || is_name_only_line(line))
        .collect()
}

/// 空行と罫線だけの行を除いた、トリム済みの行
fn meaningful_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| matches!(c, '-' | '_' | '=' | '*')))
}

fn parse_lines(lines: &[&str], block: BlockId) -> ParsedBlock {
    let mut parsed = ParsedBlock::default();
    let mut pending_name: Option<&str> = None;

    for &line in lines {
        // 合計ダメージ（ブロック内では上書き）
        if TOTAL_DAMAGE_RE.is_match(line) {
            if let Some(value) = LONG_NUMBER_RE
                .find(line)
                .and_then(|m| parse_score(m.as_str()))
            {
                parsed.totals.total_damage = Some(value);
            }
            continue;
        }

        if let Some(header) = DAMAGE_HEADER_RE.find(line) {
            let before = line[..header.start()].trim();
            let after = line[header.end()..].trim();

            if parse_score(after).is_none() {
                continue;
            }

            let raw_name = if is_valid_inline_name(before) {
                Some(before)
            } else {
                pending_name
            };

            if let Some(raw_name) = raw_name {
                parsed.detections.push(RawDetection {
                    raw_name: raw_name.to_string(),
                    raw_score_text: after.to_string(),
                    source_block: block,
                });
                pending_name = None;
            }
            continue;
        }

        // 数字の無い `Rally Queen` などは名前として扱う
        if RALLY_RE.is_match(line) {
            if let Some(count) = INTEGER_RE
                .find(line)
                .and_then(|m| m.as_str().parse().ok())
            {
                parsed.totals.rally_count = Some(count);
                continue;
            }
        }

        if is_name_only_line(line) {
            pending_name = Some(line);
        }
    }

    parsed
}

/// 見出しの前にある名前として使えるか
fn is_valid_inline_name(segment: &str) -> bool {
    if segment.to_lowercase().contains("damage") {
        return false;
    }
    strip_noise(segment).chars().any(char::is_alphabetic)
}

/// 数字を含まず、ノイズ除去後に2文字以上残る行
fn is_name_only_line(line: &str) -> bool {
    if line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if line.to_lowercase().contains("damage") {
        return false;
    }
    strip_noise(line).chars().filter(|c| !c.is_whitespace()).count() >= 2
}
