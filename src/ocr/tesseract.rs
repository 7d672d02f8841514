//! tesseract 実行ファイル経由のOCR

use crate::config::OcrConfig;
use crate::error::{LeaderboardError, Result};
use crate::ocr::OcrEngine;
use anyhow::{anyhow, Context};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: String,
    languages: String,
    psm: u8,
}

impl TesseractEngine {
    pub fn new(executable: &str, languages: &str, psm: u8) -> Self {
        Self {
            executable: executable.to_string(),
            languages: languages.to_string(),
            psm,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_path, &config.languages, config.psm)
    }

    /// `tesseract <input> stdout -l <langs> --psm <n>` の引数
    fn args(&self, input: &str) -> Vec<String> {
        vec![
            input.to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.languages.clone(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }

    fn run(&self, image: &[u8]) -> anyhow::Result<String> {
        // 画像形式はtesseract側がヘッダから判定する
        let mut input = NamedTempFile::new().context("一時ファイルを作成できません")?;
        input.write_all(image)?;
        input.flush()?;

        let input_path = input.path().to_string_lossy().to_string();
        let output = Command::new(&self.executable)
            .args(self.args(&input_path))
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "tesseract failed (code {:?}): {}",
                output.status.code(),
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn extract(&self, image: &[u8]) -> Result<String> {
        self.run(image).map_err(|e| {
            let missing = e
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
            if missing {
                LeaderboardError::OcrUnavailable(format!(
                    "{} が見つかりません",
                    self.executable
                ))
            } else {
                LeaderboardError::ocr(self.name(), format!("{:#}", e))
            }
        })
    }
}
