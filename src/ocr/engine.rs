//! OCRエンジンの共通インターフェース

use crate::config::{OcrBackend, OcrConfig};
use crate::error::Result;
use crate::ocr::tesseract::TesseractEngine;
use crate::ocr::vision::VisionEngine;
use std::sync::Arc;

/// 画像バイト列 → テキスト
///
/// 空文字列や崩れたテキストも正常な戻り値として扱う。
/// 呼び出し失敗・エンジン不在のみ `Err` を返す。
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, image: &[u8]) -> Result<String>;
}

/// 設定に従ってバックエンドを1つ選ぶ
pub fn engine_from_config(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    let engine: Arc<dyn OcrEngine> = match config.backend {
        OcrBackend::Tesseract => Arc::new(TesseractEngine::from_config(config)),
        OcrBackend::Vision => Arc::new(VisionEngine::from_config(config)?),
    };
    log::info!("OCRバックエンド: {}", engine.name());
    Ok(engine)
}
