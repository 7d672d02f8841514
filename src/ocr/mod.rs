//! OCRバックエンド
//!
//! - `tesseract`: ローカルの tesseract 実行ファイル
//! - `vision`: Google Vision API (REST)

mod engine;
pub mod tesseract;
pub mod vision;

pub use engine::{engine_from_config, OcrEngine};
pub use tesseract::TesseractEngine;
pub use vision::VisionEngine;

use log::warn;
use rayon::prelude::*;

/// 画像ごとにOCRしてブロック列を作る（入力順を保持）
///
/// 失敗した画像は空ブロックとして扱い、残りの画像はそのまま処理する。
pub fn extract_blocks(engine: &dyn OcrEngine, images: &[Vec<u8>]) -> Vec<String> {
    images
        .par_iter()
        .enumerate()
        .map(|(i, image)| match engine.extract(image) {
            Ok(text) => text,
            Err(e) => {
                warn!("画像 {} のOCRに失敗（空ブロックとして扱います）: {}", i + 1, e);
                String::new()
            }
        })
        .collect()
}
