use crate::error::{LeaderboardError, Result};
use leaderboard_common::{AliasConfig, AliasTable, Canonicalizer, Reconciler, ReportOptions, Roster};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "leaderboard-ocr";

/// Vision APIキーの環境変数
pub const VISION_KEY_ENV: &str = "GOOGLE_OCR_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    #[default]
    Tesseract,
    Vision,
}

impl std::fmt::Display for OcrBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrBackend::Tesseract => write!(f, "tesseract"),
            OcrBackend::Vision => write!(f, "vision"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    /// tesseract 実行ファイル
    pub tesseract_path: String,
    pub languages: String,
    pub psm: u8,
    pub vision_api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            tesseract_path: "tesseract".into(),
            languages: "eng+chi_sim".into(),
            psm: 6,
            vision_api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl OcrConfig {
    pub fn get_vision_api_key(&self) -> Option<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(VISION_KEY_ENV) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.vision_api_key.clone().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub roster_path: PathBuf,
    pub alias_path: Option<PathBuf>,
    /// 設定ファイル内に直接書くエイリアス（`alias_path` 側が優先）
    pub aliases: AliasConfig,
    /// inbox / raw / results を置くディレクトリ
    pub queue_root: PathBuf,
    pub poll_interval_secs: u64,
    pub report_cap: usize,
    pub max_report_chars: usize,
    pub session_ttl_secs: u64,
    pub history_file: Option<PathBuf>,
    pub ocr: OcrConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// 設定を読み込む
    ///
    /// `path` 指定時はそのファイルが必須。未指定なら既定パスを見て、
    /// 無ければ既定値を使う。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(LeaderboardError::FileNotFound(path.display().to_string()));
                }
                Self::from_file(path)
            }
            None => {
                let config_path = Self::config_path()?;
                if config_path.exists() {
                    Self::from_file(&config_path)
                } else {
                    Ok(Self::default_config())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LeaderboardError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join(APP_DIR).join("config.json"))
    }

    fn default_config() -> Self {
        let base = dirs::home_dir()
            .map(|home| home.join(".config").join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            roster_path: base.join("roster.txt"),
            alias_path: None,
            aliases: AliasConfig::default(),
            queue_root: base.join("queue"),
            poll_interval_secs: 2,
            report_cap: leaderboard_common::DEFAULT_CAP,
            max_report_chars: 1900,
            session_ttl_secs: 1800,
            history_file: None,
            ocr: OcrConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(LeaderboardError::Config(
                "poll_interval_secs は1以上にしてください".into(),
            ));
        }
        if self.report_cap == 0 {
            return Err(LeaderboardError::Config("report_cap は1以上にしてください".into()));
        }
        Ok(())
    }

    /// 名簿を読み込む（無い・空は起動不可）
    pub fn load_roster(&self) -> Result<Roster> {
        if !self.roster_path.exists() {
            return Err(LeaderboardError::RosterNotFound(
                self.roster_path.display().to_string(),
            ));
        }

        Roster::from_file(&self.roster_path).map_err(|e| match e {
            leaderboard_common::Error::Roster(_) => {
                LeaderboardError::EmptyRoster(self.roster_path.display().to_string())
            }
            other => other.into(),
        })
    }

    /// 設定内エイリアスとファイルをマージしてテーブル化
    pub fn load_aliases(&self) -> Result<AliasTable> {
        let mut aliases = self.aliases.clone();

        if let Some(path) = &self.alias_path {
            if !path.exists() {
                return Err(LeaderboardError::FileNotFound(path.display().to_string()));
            }
            aliases.merge(&AliasConfig::from_file(path)?);
        }

        Ok(aliases.build()?)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            cap: self.report_cap,
            max_chars: self.max_report_chars,
            ..Default::default()
        }
    }

    /// 名簿・エイリアス・整形オプションから処理器を組み立てる
    pub fn build_reconciler(&self) -> Result<Reconciler> {
        let roster = self.load_roster()?;
        let aliases = self.load_aliases()?;
        log::info!("名簿 {}名 / エイリアス {}件を読み込みました", roster.len(), aliases.len());

        Ok(Reconciler::new(
            Canonicalizer::new(roster, aliases),
            self.report_options(),
        ))
    }
}
