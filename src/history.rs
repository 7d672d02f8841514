//! レポート履歴（追記のみ）

use crate::error::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// レポートを1件追記
    ///
    /// ```text
    /// === OCR Result shot.png.txt ===
    /// 📊 Bear Trap Damage Summary
    /// ...
    /// (saved 2024-05-01 21:03:11)
    /// ```
    pub fn append(&self, item: &str, report: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let entry = format!(
            "\n=== OCR Result {} ===\n{}\n(saved {})\n\n",
            item,
            report,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        file.write_all(entry.as_bytes())?;
        Ok(())
    }
}
