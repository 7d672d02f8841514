//! ファイルベースのステージキュー
//!
//! ```text
//! <root>/
//! ├── inbox/     画像（抽出ループが所有）
//! ├── raw/       OCRテキスト `<画像名>.txt`（解析ループが所有）
//! └── results/   レポート `<画像名>.txt`
//! ```
//!
//! アイテムは「次のステージへ書き込み → 元のステージから削除」の順で移る。
//! 書き込みは一時ファイル経由で行うため、途中で落ちても中途半端な
//! ファイルが一覧に現れることはない。

use crate::error::{LeaderboardError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Inbox,
    Raw,
    Results,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Inbox, Stage::Raw, Stage::Results];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Inbox => "inbox",
            Stage::Raw => "raw",
            Stage::Results => "results",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.dir_name())
    }
}

/// 画像キーに対応する raw / results のキー
pub fn text_key(image_key: &str) -> String {
    format!("{}.txt", image_key)
}

#[derive(Debug, Clone)]
pub struct StageQueue {
    root: PathBuf,
}

impl StageQueue {
    /// ルート配下に各ステージのディレクトリを用意して開く
    pub fn open(root: &Path) -> Result<Self> {
        for stage in Stage::ALL {
            std::fs::create_dir_all(root.join(stage.dir_name()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    fn item_path(&self, stage: Stage, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\'])
        {
            return Err(LeaderboardError::Queue(format!("不正なキー: {:?}", key)));
        }
        Ok(self.dir(stage).join(key))
    }

    /// ステージ内のアイテム一覧（ファイル名順、ドットファイルは除外）
    pub fn list(&self, stage: Stage) -> Result<Vec<String>> {
        let dir = self.dir(stage);
        if !dir.exists() {
            return Err(LeaderboardError::FolderNotFound(dir.display().to_string()));
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| LeaderboardError::Queue(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            if key.starts_with('.') {
                continue;
            }
            keys.push(key);
        }

        keys.sort();
        Ok(keys)
    }

    pub fn contains(&self, stage: Stage, key: &str) -> bool {
        self.item_path(stage, key).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn read(&self, stage: Stage, key: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.item_path(stage, key)?)?)
    }

    pub fn read_text(&self, stage: Stage, key: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.item_path(stage, key)?)?)
    }

    /// 同じステージ内に確定的に書き込む（既存は置き換え）
    pub fn write(&self, stage: Stage, key: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.item_path(stage, key)?;

        // NamedTempFile の既定名は `.tmp` で始まるので一覧には出ない
        let mut temp = NamedTempFile::new_in(self.dir(stage))?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;
        sync_dir(&self.dir(stage))?;

        Ok(path)
    }

    pub fn remove(&self, stage: Stage, key: &str) -> Result<()> {
        std::fs::remove_file(self.item_path(stage, key)?)?;
        Ok(())
    }

    /// 衝突しないキーを返す（`a.png` → `a-1.png` → `a-2.png` ...）
    pub fn unique_key(&self, stage: Stage, name: &str) -> String {
        if !self.contains(stage, name) {
            return name.to_string();
        }

        let (stem, ext) = match name.rfind('.') {
            Some(i) if i > 0 => (&name[..i], &name[i..]),
            _ => (name, ""),
        };

        (1..)
            .map(|n| format!("{}-{}{}", stem, n, ext))
            .find(|candidate| !self.contains(stage, candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

/// リネーム結果（ディレクトリエントリ）を確定させる
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
