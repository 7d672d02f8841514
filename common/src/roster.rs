//! 名簿（Roster）
//!
//! 正規プレイヤー名の一覧。起動時に一度だけ読み込み、以降は読み取り専用。
//! 文字種（Latin / CJK）は名前の内容から自動判定する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 名前の文字種
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Cjk,
}

/// 名簿エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub canonical_name: String,
    pub script: Script,
}

impl RosterEntry {
    pub fn new(name: &str) -> Self {
        Self {
            canonical_name: name.to_string(),
            script: detect_script(name),
        }
    }
}

/// CJK統合漢字・ハングル音節か
pub fn is_cjk_char(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{ac00}'..='\u{d7af}')
}

/// CJK文字を1文字でも含むか
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

/// 文字種を判定（CJKを含めばCJK、それ以外はLatin）
pub fn detect_script(text: &str) -> Script {
    if contains_cjk(text) {
        Script::Cjk
    } else {
        Script::Latin
    }
}

/// 正規名の名簿
#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    names: HashSet<String>,
}

impl Roster {
    /// 名前の列から構築（空行は無視、重複は先勝ち）
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if seen.insert(name.to_string()) {
                entries.push(RosterEntry::new(name));
            }
        }

        if entries.is_empty() {
            return Err(Error::Roster("名簿が空です".into()));
        }

        Ok(Self {
            entries,
            names: seen,
        })
    }

    /// 改行区切りテキストから読み込み
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_names(text.lines())
    }

    /// ファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(content.trim_start_matches('\u{feff}'))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 文字種ごとの候補（名簿順）
    ///
    /// Latin側には英字を含む混在名（例: `奶茶MilkTea`）も含める。
    pub fn partition(&self, script: Script) -> Vec<&RosterEntry> {
        self.entries
            .iter()
            .filter(|e| match script {
                Script::Cjk => e.script == Script::Cjk,
                Script::Latin => {
                    e.script == Script::Latin
                        || e.canonical_name.chars().any(|c| c.is_ascii_alphabetic())
                }
            })
            .collect()
    }
}
