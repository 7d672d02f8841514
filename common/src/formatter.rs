//! サマリー整形
//!
//! 集計結果を送信用のテキストに変換する純関数群。
//!
//! ```text
//! 📊 Bear Trap Damage Summary
//! Rallies: 12
//! Total Alliance Damage: 1,234,567,890
//!
//! Top Damage:
//! 1) PEiPEi — 600,000,000
//! 2) FictionAddict — 467,388,307
//! ```

use crate::aggregator::{Leaderboard, DEFAULT_CAP};
use crate::types::{AggregatedEntry, ScalarTotals};
use serde::{Deserialize, Serialize};

/// 有効なエントリが1件もない場合の本文
pub const NO_ENTRIES_MESSAGE: &str = "⚠️ No valid players detected from OCR.";

const TRUNCATION_MARK: &str = "…";

/// 整形オプション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportOptions {
    pub title: String,
    /// 表示する最大件数
    pub cap: usize,
    /// 最大文字数（0で無制限）
    pub max_chars: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "📊 Bear Trap Damage Summary".into(),
            cap: DEFAULT_CAP,
            max_chars: 1900,
        }
    }
}

/// 3桁区切り（`1234567` → `1,234,567`）
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// 集計結果を整形（上位 `cap` 件）
pub fn render(board: &Leaderboard, options: &ReportOptions) -> String {
    render_entries(board.top(options.cap), board.totals(), options)
}

/// エントリ列とスカラー値を整形
pub fn render_entries(
    entries: &[AggregatedEntry],
    totals: &ScalarTotals,
    options: &ReportOptions,
) -> String {
    let mut lines = vec![options.title.clone()];

    if let Some(rallies) = totals.rally_count {
        lines.push(format!("Rallies: {}", rallies));
    }
    if let Some(total) = totals.total_damage {
        lines.push(format!("Total Alliance Damage: {}", format_thousands(total)));
    }

    if entries.is_empty() {
        lines.push(NO_ENTRIES_MESSAGE.to_string());
    } else {
        lines.push(String::new());
        lines.push("Top Damage:".to_string());
        for entry in entries.iter().take(options.cap) {
            lines.push(format!(
                "{}) {} — {}",
                entry.rank,
                entry.identity,
                format_thousands(entry.score)
            ));
        }
    }

    truncate_report(&lines.join("\n"), options.max_chars)
}

/// 最大文字数に収まるよう行単位で切り詰める
///
/// 切り詰めた場合は末尾に `…` の行を付ける。先頭行すら収まらない場合は
/// 文字単位で切る。
pub fn truncate_report(report: &str, max_chars: usize) -> String {
    if max_chars == 0 || report.chars().count() <= max_chars {
        return report.to_string();
    }

    let budget = max_chars.saturating_sub(TRUNCATION_MARK.chars().count() + 1);
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;

    for line in report.lines() {
        let cost = line.chars().count() + usize::from(!kept.is_empty());
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(line);
    }

    if kept.is_empty() {
        return report.chars().take(max_chars).collect();
    }

    format!("{}\n{}", kept.join("\n"), TRUNCATION_MARK)
}
