//! キューのポーリングループ
//!
//! - 抽出ループ: inbox → OCR → raw
//! - 解析ループ: raw → 集計・整形 → results
//!
//! 1回分の走査（tick）は同期関数として切り出してあり、ループはそれを
//! 一定間隔で `spawn_blocking` で呼ぶだけ。アイテム単位の失敗はログに
//! 残して次のアイテムへ進み、ループ自体は止めない。

use crate::error::{LeaderboardError, Result};
use crate::history::History;
use crate::ocr::OcrEngine;
use crate::queue::stage::{text_key, Stage, StageQueue};
use leaderboard_common::Reconciler;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// 1回の走査の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 次のステージへ進めた数
    pub advanced: usize,
    /// 失敗して元のステージに残した数
    pub failed: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.advanced == 0 && self.failed == 0
    }
}

/// inbox を1回走査する
///
/// OCR成功 → raw に書き込み → inbox から削除。失敗したものは inbox に残り、
/// 次回の走査で再試行される。
pub fn extraction_tick(queue: &StageQueue, engine: &dyn OcrEngine) -> Result<TickReport> {
    let mut report = TickReport::default();

    for key in queue.list(Stage::Inbox)? {
        match isolate(|| extract_item(queue, engine, &key)) {
            Ok(()) => report.advanced += 1,
            Err(e) => {
                warn!("[抽出] {} は inbox に残します: {}", key, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn extract_item(queue: &StageQueue, engine: &dyn OcrEngine, key: &str) -> Result<()> {
    debug!("[抽出] {} をOCR中 ({})", key, engine.name());
    let image = queue.read(Stage::Inbox, key)?;
    let text = engine.extract(&image)?;

    let raw_key = text_key(key);
    queue.write(Stage::Raw, &raw_key, text.as_bytes())?;
    info!("[抽出] {} → raw/{}", key, raw_key);

    queue.remove(Stage::Inbox, key)?;
    Ok(())
}

/// raw を1回走査する
///
/// 各アイテムを1ブロックのバッチとして集計し、results に書き込んでから
/// raw から削除する。
pub fn parsing_tick(
    queue: &StageQueue,
    reconciler: &Reconciler,
    history: Option<&History>,
) -> Result<TickReport> {
    let mut report = TickReport::default();

    for key in queue.list(Stage::Raw)? {
        match isolate(|| parse_item(queue, reconciler, history, &key)) {
            Ok(()) => report.advanced += 1,
            Err(e) => {
                warn!("[解析] {} は raw に残します: {}", key, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn parse_item(
    queue: &StageQueue,
    reconciler: &Reconciler,
    history: Option<&History>,
    key: &str,
) -> Result<()> {
    let text = queue.read_text(Stage::Raw, key)?;
    let result = reconciler.run(&[text]);

    queue.write(Stage::Results, key, result.report.as_bytes())?;
    info!(
        "[解析] {} → results/{} ({}名)",
        key,
        key,
        result.board.len()
    );

    if let Some(history) = history {
        if let Err(e) = history.append(key, &result.report) {
            warn!("履歴への追記に失敗: {}: {}", history.path().display(), e);
        }
    }

    queue.remove(Stage::Raw, key)?;
    Ok(())
}

/// 1アイテム分の処理。パニックもそのアイテムの失敗として扱う
fn isolate<F>(item: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    catch_unwind(AssertUnwindSafe(item)).unwrap_or_else(|payload| {
        Err(LeaderboardError::Queue(format!(
            "処理中にパニック: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("不明")
}

/// 抽出ループ（`shutdown` が true になるまで）
pub async fn run_extraction_loop(
    queue: Arc<StageQueue>,
    engine: Arc<dyn OcrEngine>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) {
    info!("抽出ループ開始: {}", queue.dir(Stage::Inbox).display());
    poll(interval, shutdown, "抽出", move || {
        extraction_tick(&queue, engine.as_ref())
    })
    .await;
    info!("抽出ループ終了");
}

/// 解析ループ（`shutdown` が true になるまで）
pub async fn run_parsing_loop(
    queue: Arc<StageQueue>,
    reconciler: Arc<Reconciler>,
    history: Option<History>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) {
    info!("解析ループ開始: {}", queue.dir(Stage::Raw).display());
    poll(interval, shutdown, "解析", move || {
        parsing_tick(&queue, &reconciler, history.as_ref())
    })
    .await;
    info!("解析ループ終了");
}

async fn poll<F>(
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    label: &'static str,
    tick: F,
) where
    F: Fn() -> Result<TickReport> + Send + Sync + 'static,
{
    let tick = Arc::new(tick);
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let tick = Arc::clone(&tick);
        match tokio::task::spawn_blocking(move || (*tick)()).await {
            Ok(Ok(report)) if !report.is_idle() => {
                info!("[{}] 進行 {}件 / 失敗 {}件", label, report.advanced, report.failed);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("[{}] キューの走査に失敗: {}", label, e),
            Err(e) => error!("[{}] ワーカーが異常終了: {}", label, e),
        }

        if *shutdown.borrow() {
            break;
        }
    }
}
