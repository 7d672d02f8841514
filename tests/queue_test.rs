//! ワーカーキューテスト
//!
//! inbox → raw → results の受け渡しと、失敗時にアイテムが残ることを検証

use leaderboard_common::{AliasTable, Canonicalizer, Reconciler, ReportOptions, Roster};
use leaderboard_ocr::error::{LeaderboardError, Result};
use leaderboard_ocr::history::History;
use leaderboard_ocr::ocr::OcrEngine;
use leaderboard_ocr::queue::{
    extraction_tick, parsing_tick, run_extraction_loop, Stage, StageQueue, TickReport,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// 画像バイト列をそのままテキストとして返すテスト用エンジン
///
/// `offline` の間は全件失敗、内容が `FAIL` の画像は常に失敗、`PANIC` はパニックする。
#[derive(Default)]
struct FakeEngine {
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl OcrEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn extract(&self, image: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(LeaderboardError::OcrUnavailable("offline".into()));
        }
        if image == b"FAIL" {
            return Err(LeaderboardError::ocr("fake", "unreadable image"));
        }
        if image == b"PANIC" {
            panic!("engine crashed");
        }
        Ok(String::from_utf8_lossy(image).to_string())
    }
}

fn reconciler() -> Reconciler {
    let roster = Roster::parse("PEiPEi\nFictionAddict\nMados").unwrap();
    let aliases = AliasTable::from_pairs([("ΡΕΪΡΕΙ", "PEiPEi")]);
    Reconciler::new(Canonicalizer::new(roster, aliases), ReportOptions::default())
}

// =============================================
// 抽出ループ
// =============================================

/// OCRが失敗したアイテムは inbox に残り、次の走査で再試行される
#[test]
fn test_ocr_failure_leaves_item_in_inbox_and_retries() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();
    let engine = FakeEngine::default();

    queue
        .write(Stage::Inbox, "shot.png", b"PEiPEi\nDamage Points: 500,000,000")
        .unwrap();

    engine.offline.store(true, Ordering::SeqCst);
    let report = extraction_tick(&queue, &engine).unwrap();
    assert_eq!(report, TickReport { advanced: 0, failed: 1 });
    assert_eq!(queue.list(Stage::Inbox).unwrap(), vec!["shot.png"]);
    assert!(queue.list(Stage::Raw).unwrap().is_empty());

    engine.offline.store(false, Ordering::SeqCst);
    let report = extraction_tick(&queue, &engine).unwrap();
    assert_eq!(report, TickReport { advanced: 1, failed: 0 });
    assert!(queue.list(Stage::Inbox).unwrap().is_empty());
    assert_eq!(
        queue.read_text(Stage::Raw, "shot.png.txt").unwrap(),
        "PEiPEi\nDamage Points: 500,000,000"
    );
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
}

/// 1件の失敗で残りの走査は止まらない
#[test]
fn test_one_failure_does_not_block_others() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();
    let engine = FakeEngine::default();

    queue.write(Stage::Inbox, "a.png", b"FAIL").unwrap();
    queue.write(Stage::Inbox, "b.png", b"Mados\nDamage Points: 1,000").unwrap();

    let report = extraction_tick(&queue, &engine).unwrap();
    assert_eq!(report, TickReport { advanced: 1, failed: 1 });
    assert_eq!(queue.list(Stage::Inbox).unwrap(), vec!["a.png"]);
    assert_eq!(queue.list(Stage::Raw).unwrap(), vec!["b.png.txt"]);
}

/// エンジンがパニックしてもそのアイテムだけ失敗扱いで、後続は進む
#[test]
fn test_engine_panic_does_not_block_later_items() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();
    let engine = FakeEngine::default();

    queue.write(Stage::Inbox, "a.png", b"PANIC").unwrap();
    queue.write(Stage::Inbox, "b.png", b"Mados\nDamage Points: 1,000").unwrap();

    let report = extraction_tick(&queue, &engine).unwrap();
    assert_eq!(report, TickReport { advanced: 1, failed: 1 });
    assert_eq!(queue.list(Stage::Inbox).unwrap(), vec!["a.png"]);
    assert_eq!(queue.list(Stage::Raw).unwrap(), vec!["b.png.txt"]);
}

/// 空のテキストも正常なOCR結果として raw に進む
#[test]
fn test_empty_ocr_text_advances() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();

    queue.write(Stage::Inbox, "blank.png", b"").unwrap();
    let report = extraction_tick(&queue, &FakeEngine::default()).unwrap();

    assert_eq!(report.advanced, 1);
    assert_eq!(queue.read_text(Stage::Raw, "blank.png.txt").unwrap(), "");
}

// =============================================
// 解析ループ
// =============================================

/// results に書き込んでから raw を削除する
#[test]
fn test_parsing_tick_writes_results_then_removes_raw() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(&dir.path().join("queue")).unwrap();
    let history = History::new(&dir.path().join("history.txt"));

    queue
        .write(
            Stage::Raw,
            "shot.png.txt",
            "Rallies: 3\nTotal Alliance Damage: 1,234,567,890\nPEiPEi\nDamage Points: 500,000,000"
                .as_bytes(),
        )
        .unwrap();

    let report = parsing_tick(&queue, &reconciler(), Some(&history)).unwrap();
    assert_eq!(report, TickReport { advanced: 1, failed: 0 });
    assert!(queue.list(Stage::Raw).unwrap().is_empty());

    let result = queue.read_text(Stage::Results, "shot.png.txt").unwrap();
    assert!(result.contains("Rallies: 3"));
    assert!(result.contains("Total Alliance Damage: 1,234,567,890"));
    assert!(result.contains("1) PEiPEi — 500,000,000"));

    let logged = std::fs::read_to_string(history.path()).unwrap();
    assert!(logged.contains("=== OCR Result shot.png.txt ==="));
    assert!(logged.contains("1) PEiPEi — 500,000,000"));
}

/// 読めない raw アイテムは残し、他のアイテムは処理する
#[test]
fn test_unreadable_raw_item_is_kept() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();

    queue.write(Stage::Raw, "bad.png.txt", &[0xff, 0xfe, 0x00]).unwrap();
    queue
        .write(Stage::Raw, "good.png.txt", b"Mados\nDamage Points: 1,000")
        .unwrap();

    let report = parsing_tick(&queue, &reconciler(), None).unwrap();
    assert_eq!(report, TickReport { advanced: 1, failed: 1 });
    assert_eq!(queue.list(Stage::Raw).unwrap(), vec!["bad.png.txt"]);
    assert_eq!(queue.list(Stage::Results).unwrap(), vec!["good.png.txt"]);
}

/// 履歴に書けなくてもアイテムは進む
#[test]
fn test_history_failure_does_not_block() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(&dir.path().join("queue")).unwrap();
    // ディレクトリを履歴ファイルとして指定して追記を失敗させる
    let history = History::new(dir.path());

    queue.write(Stage::Raw, "a.png.txt", b"Mados\nDamage Points: 1,000").unwrap();
    let report = parsing_tick(&queue, &reconciler(), Some(&history)).unwrap();

    assert_eq!(report.advanced, 1);
    assert!(queue.list(Stage::Raw).unwrap().is_empty());
    assert!(queue.contains(Stage::Results, "a.png.txt"));
}

/// 同じ raw テキストは何度処理しても同じ結果になる
#[test]
fn test_reprocessing_is_idempotent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();
    let reconciler = reconciler();
    let text = "ΡΕΪΡΕΙ\nDamage Points: 600,000,000\nFictionAddict\nDamage Points: 467,388,307";

    queue.write(Stage::Raw, "a.png.txt", text.as_bytes()).unwrap();
    parsing_tick(&queue, &reconciler, None).unwrap();
    let first = queue.read_text(Stage::Results, "a.png.txt").unwrap();

    queue.write(Stage::Raw, "a.png.txt", text.as_bytes()).unwrap();
    parsing_tick(&queue, &reconciler, None).unwrap();
    let second = queue.read_text(Stage::Results, "a.png.txt").unwrap();

    assert_eq!(first, second);
    assert!(first.contains("1) PEiPEi — 600,000,000\n2) FictionAddict — 467,388,307"));
}

/// 有効な行が無ければ「検出なし」のレポート
#[test]
fn test_garbled_item_reports_no_players() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();

    queue.write(Stage::Raw, "x.png.txt", b"@@ ## ~~\n---").unwrap();
    parsing_tick(&queue, &reconciler(), None).unwrap();

    let result = queue.read_text(Stage::Results, "x.png.txt").unwrap();
    assert!(result.contains("No valid players detected"));
}

// =============================================
// 通し
// =============================================

#[test]
fn test_inbox_to_results() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = StageQueue::open(dir.path()).unwrap();
    let engine = FakeEngine::default();

    queue
        .write(Stage::Inbox, "shot.png", b"[BLT]Mados\nDamage Points: 42,000")
        .unwrap();

    extraction_tick(&queue, &engine).unwrap();
    parsing_tick(&queue, &reconciler(), None).unwrap();

    for stage in [Stage::Inbox, Stage::Raw] {
        assert!(queue.list(stage).unwrap().is_empty());
    }
    let result = queue.read_text(Stage::Results, "shot.png.txt").unwrap();
    assert!(result.contains("1) Mados — 42,000"));
}

/// ポーリングループは shutdown で止まる
#[tokio::test]
async fn test_extraction_loop_processes_and_stops() {
    let dir = tempdir().expect("Failed to create temp dir");
    let queue = Arc::new(StageQueue::open(dir.path()).unwrap());
    let engine: Arc<dyn OcrEngine> = Arc::new(FakeEngine::default());

    queue.write(Stage::Inbox, "a.png", b"text").unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(run_extraction_loop(
        Arc::clone(&queue),
        engine,
        Duration::from_millis(10),
        shutdown_rx,
    ));

    for _ in 0..200 {
        if queue.contains(Stage::Raw, "a.png.txt") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();

    assert!(queue.list(Stage::Inbox).unwrap().is_empty());
    assert_eq!(queue.read_text(Stage::Raw, "a.png.txt").unwrap(), "text");
}
