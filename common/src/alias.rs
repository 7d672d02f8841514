//! エイリアス変換モジュール
//!
//! 汎用の類似度では拾えないOCRの系統的な誤読（ギリシャ文字化けなど）を
//! 正規名へ写像する。照合では名簿より先に参照される。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// エイリアス定義（JSON）
///
/// ```json
/// {
///   "aliases": { "ΡΕΪΡΕΙ": "PEiPEi" },
///   "groups": { "奶茶 (MilkTea)": ["奶茶", "奶苶", "Milk Tea"] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasConfig {
    /// 誤読表記 → 正規名
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// 正規名 → 誤読表記の一覧
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl AliasConfig {
    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// 設定をマージ（後から追加した設定が優先）
    pub fn merge(&mut self, other: &AliasConfig) {
        self.aliases.extend(other.aliases.clone());
        self.groups.extend(other.groups.clone());
    }

    /// 照合用テーブルに変換
    ///
    /// グループを展開した後に個別エイリアスを適用するため、同じ表記が
    /// 両方にあれば `aliases` 側が勝つ。
    pub fn build(&self) -> Result<AliasTable> {
        let mut map = HashMap::new();

        for (canonical, variants) in &self.groups {
            let canonical = canonical.trim();
            if canonical.is_empty() {
                return Err(Error::Config("エイリアスの正規名が空です".into()));
            }
            for variant in variants {
                let variant = variant.trim();
                if !variant.is_empty() {
                    map.insert(variant.to_string(), canonical.to_string());
                }
            }
        }

        for (variant, canonical) in &self.aliases {
            let (variant, canonical) = (variant.trim(), canonical.trim());
            if canonical.is_empty() {
                return Err(Error::Config(format!(
                    "エイリアス「{}」の正規名が空です",
                    variant
                )));
            }
            if !variant.is_empty() {
                map.insert(variant.to_string(), canonical.to_string());
            }
        }

        Ok(AliasTable::from_map(map))
    }
}

/// 不変のエイリアス表
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: HashMap<String, String>,
    targets: HashSet<String>,
}

impl AliasTable {
    pub fn from_map(map: HashMap<String, String>) -> Self {
        let targets = map.values().cloned().collect();
        Self { map, targets }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::from_map(
            pairs
                .into_iter()
                .map(|(v, c)| (v.to_string(), c.to_string()))
                .collect(),
        )
    }

    /// 完全一致で引く
    pub fn lookup(&self, variant: &str) -> Option<&str> {
        self.map.get(variant).map(String::as_str)
    }

    /// 正規名（写像先）として登録されているか
    pub fn is_target(&self, name: &str) -> bool {
        self.targets.contains(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
