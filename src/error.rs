use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("名簿ファイルが見つかりません: {0}。`leaderboard-ocr config --init` で設定を作成してください")]
    RosterNotFound(String),

    #[error("名簿が空です: {0}")]
    EmptyRoster(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("OCRエラー ({engine}): {message}")]
    Ocr { engine: String, message: String },

    #[error("OCRエンジンが利用できません: {0}")]
    OcrUnavailable(String),

    #[error("キュー操作エラー: {0}")]
    Queue(String),

    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] leaderboard_common::Error),
}

impl LeaderboardError {
    pub fn ocr(engine: &str, message: impl Into<String>) -> Self {
        Self::Ocr {
            engine: engine.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;
