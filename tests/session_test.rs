//! 対話セッションテスト
//!
//! 開始・画像追加・完了の流れと、同一画像・OCR失敗の扱いを検証

use leaderboard_common::{AliasTable, Canonicalizer, Reconciler, ReportOptions, Roster, NO_ENTRIES_MESSAGE};
use leaderboard_ocr::error::{LeaderboardError, Result};
use leaderboard_ocr::ocr::OcrEngine;
use leaderboard_ocr::session::{
    run_interactive, AddOutcome, FinishOutcome, SessionRegistry, NO_IMAGES_MESSAGE,
};
use std::io::Cursor;
use std::time::Duration;
use tempfile::tempdir;

/// 画像バイト列をそのままテキストとして返す（`FAIL` は失敗）
struct FakeEngine;

impl OcrEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn extract(&self, image: &[u8]) -> Result<String> {
        if image == b"FAIL" {
            return Err(LeaderboardError::ocr("fake", "unreadable image"));
        }
        Ok(String::from_utf8_lossy(image).to_string())
    }
}

fn reconciler() -> Reconciler {
    let roster = Roster::parse("PEiPEi\nFictionAddict\n奶茶 (MilkTea)").unwrap();
    let aliases = AliasTable::from_pairs([("ΡΕΪΡΕΙ", "PEiPEi"), ("奶茶", "奶茶 (MilkTea)")]);
    Reconciler::new(Canonicalizer::new(roster, aliases), ReportOptions::default())
}

fn registry() -> SessionRegistry {
    SessionRegistry::new(Duration::from_secs(1800))
}

/// 重なったスクリーンショットは最大値で1行にまとまる
#[test]
fn test_session_reconciles_overlapping_screenshots() {
    let mut registry = registry();
    registry.start("user");

    registry.add_image("user", b"PEiPEi\nDamage Points: 500,000,000".to_vec());
    registry.add_image("user", "ΡΕΪΡΕΙ\nDamage Points: 600,000,000".as_bytes().to_vec());

    match registry.finish("user", &FakeEngine, &reconciler()) {
        FinishOutcome::Report(result) => {
            assert_eq!(result.board.len(), 1);
            assert!(result.report.contains("1) PEiPEi — 600,000,000"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!registry.is_open("user"));
}

/// 画像なしで完了すると NoImages
#[test]
fn test_finish_without_images() {
    let mut registry = registry();
    registry.start("user");

    assert!(matches!(
        registry.finish("user", &FakeEngine, &reconciler()),
        FinishOutcome::NoImages
    ));
    assert!(matches!(
        registry.finish("user", &FakeEngine, &reconciler()),
        FinishOutcome::NoSession
    ));
}

/// 同一画像は1回だけOCRされる
#[test]
fn test_duplicate_image_skipped() {
    let mut registry = registry();
    registry.start("user");

    let image = b"FictionAddict\nDamage Points: 467,388,307".to_vec();
    assert_eq!(registry.add_image("user", image.clone()), AddOutcome::Added { count: 1 });
    assert_eq!(registry.add_image("user", image), AddOutcome::Duplicate);
}

/// OCRに失敗した画像は空ブロック扱いで、残りの画像は集計される
#[test]
fn test_ocr_failure_treated_as_empty_block() {
    let mut registry = registry();
    registry.start("user");
    registry.add_image("user", b"FAIL".to_vec());
    registry.add_image("user", "奶茶\nDamage Points: 12,345".as_bytes().to_vec());

    match registry.finish("user", &FakeEngine, &reconciler()) {
        FinishOutcome::Report(result) => {
            assert_eq!(result.block_count, 2);
            assert!(result.report.contains("1) 奶茶 (MilkTea) — 12,345"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

/// 全て読めなければ「検出なし」のレポート
#[test]
fn test_all_garbled_reports_no_players() {
    let mut registry = registry();
    registry.start("user");
    registry.add_image("user", b"~~ garbage 12 ~~".to_vec());

    match registry.finish("user", &FakeEngine, &reconciler()) {
        FinishOutcome::Report(result) => {
            assert!(result.board.is_empty());
            assert!(result.report.contains(NO_ENTRIES_MESSAGE));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

/// 行入力でのセッション
#[test]
fn test_run_interactive() {
    let dir = tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("1.png");
    let second = dir.path().join("2.png");
    std::fs::write(&first, "PEiPEi\nDamage Points: 500,000,000").unwrap();
    std::fs::write(&second, "FictionAddict\nDamage Points: 467,388,307").unwrap();

    let input = format!(
        "{}\nstart\n{}\n{}\n{}\ndone\nstart\ndone\nquit\nstart\n",
        first.display(),
        first.display(),
        first.display(),
        second.display()
    );

    let mut out = Vec::new();
    let mut registry = registry();
    run_interactive(
        Cursor::new(input),
        &mut out,
        "cli",
        &mut registry,
        &FakeEngine,
        &reconciler(),
    )
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("1枚目"));
    assert!(out.contains("同じ画像は追加済みです"));
    assert!(out.contains("1) PEiPEi — 500,000,000\n2) FictionAddict — 467,388,307"));
    assert!(out.contains(NO_IMAGES_MESSAGE));
    // quit 以降は読まない
    assert!(!registry.is_open("cli"));
}

/// 読めないパスは警告だけで続行
#[test]
fn test_run_interactive_missing_file() {
    let mut out = Vec::new();
    let mut registry = registry();
    run_interactive(
        Cursor::new("start\n/nonexistent/shot.png\ndone\n"),
        &mut out,
        "cli",
        &mut registry,
        &FakeEngine,
        &reconciler(),
    )
    .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("読み込めません"));
    assert!(out.contains(NO_IMAGES_MESSAGE));
}
