//! 対話セッション
//!
//! 「開始 → スクリーンショットを何枚か送る → 完了」の流れで1バッチを作り、
//! キューを通さずにその場で集計する。セッションはキー（利用者）ごとに
//! 最大1つで、開始し直すと前のセッションは破棄される。

use crate::error::Result;
use crate::ocr::{extract_blocks, OcrEngine};
use leaderboard_common::{Reconciler, Reconciliation};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// 画像が1枚も無いまま完了した場合の応答
pub const NO_IMAGES_MESSAGE: &str = "⚠️ No images received.";

/// 画像のSHA-256（16進）
pub fn image_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// 重複を除いた画像の集まり
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    images: Vec<Vec<u8>>,
    digests: HashSet<String>,
}

impl ImageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加（同一内容の画像は追加せず false）
    pub fn push(&mut self, bytes: Vec<u8>) -> bool {
        if !self.digests.insert(image_digest(&bytes)) {
            return false;
        }
        self.images.push(bytes);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 全画像をOCRして1バッチとして集計
    pub fn reconcile(&self, engine: &dyn OcrEngine, reconciler: &Reconciler) -> Reconciliation {
        let blocks = extract_blocks(engine, &self.images);
        reconciler.run(&blocks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added { count: usize },
    Duplicate,
    /// 開いているセッションが無い（画像は無視）
    NoSession,
}

#[derive(Debug)]
pub enum FinishOutcome {
    NoSession,
    NoImages,
    Report(Reconciliation),
}

#[derive(Debug)]
struct OpenSession {
    started: Instant,
    batch: ImageBatch,
}

/// キーごとの開いているセッション
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<String, OpenSession>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// セッションを開始（既存のものは破棄、破棄したら true）
    pub fn start(&mut self, key: &str) -> bool {
        self.start_at(key, Instant::now())
    }

    pub fn start_at(&mut self, key: &str, now: Instant) -> bool {
        let previous = self.sessions.insert(
            key.to_string(),
            OpenSession {
                started: now,
                batch: ImageBatch::new(),
            },
        );

        if let Some(previous) = &previous {
            info!("{}: 未完了のセッション（{}枚）を破棄しました", key, previous.batch.len());
        }
        previous.is_some()
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn add_image(&mut self, key: &str, bytes: Vec<u8>) -> AddOutcome {
        let Some(session) = self.sessions.get_mut(key) else {
            debug!("{}: セッション外の画像を無視", key);
            return AddOutcome::NoSession;
        };

        if session.batch.push(bytes) {
            AddOutcome::Added {
                count: session.batch.len(),
            }
        } else {
            debug!("{}: 同一画像をスキップ", key);
            AddOutcome::Duplicate
        }
    }

    /// セッションを閉じて集計する
    pub fn finish(
        &mut self,
        key: &str,
        engine: &dyn OcrEngine,
        reconciler: &Reconciler,
    ) -> FinishOutcome {
        let Some(session) = self.sessions.remove(key) else {
            return FinishOutcome::NoSession;
        };

        if session.batch.is_empty() {
            return FinishOutcome::NoImages;
        }

        info!("{}: {}枚を集計します", key, session.batch.len());
        FinishOutcome::Report(session.batch.reconcile(engine, reconciler))
    }

    pub fn cancel(&mut self, key: &str) -> bool {
        self.sessions.remove(key).is_some()
    }

    /// 期限切れのセッションを破棄（破棄した数）
    pub fn expire_stale(&mut self) -> usize {
        self.expire_stale_at(Instant::now())
    }

    pub fn expire_stale_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.started) < ttl);

        let expired = before - self.sessions.len();
        if expired > 0 {
            info!("期限切れのセッションを{}件破棄しました", expired);
        }
        expired
    }
}

/// 対話入力の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Done,
    Cancel,
    Quit,
    Image(PathBuf),
    Empty,
}

pub fn parse_command(line: &str) -> SessionCommand {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => SessionCommand::Empty,
        "start" => SessionCommand::Start,
        "done" => SessionCommand::Done,
        "cancel" => SessionCommand::Cancel,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        _ => SessionCommand::Image(PathBuf::from(line)),
    }
}

/// 行単位の対話セッションを回す（入力が尽きるか `quit` で終了）
pub fn run_interactive<R: BufRead, W: Write>(
    input: R,
    mut out: W,
    key: &str,
    registry: &mut SessionRegistry,
    engine: &dyn OcrEngine,
    reconciler: &Reconciler,
) -> Result<()> {
    writeln!(out, "操作: start / 画像パス / done / cancel / quit")?;

    for line in input.lines() {
        let line = line?;
        registry.expire_stale();

        match parse_command(&line) {
            SessionCommand::Empty => {}
            SessionCommand::Quit => break,
            SessionCommand::Start => {
                registry.start(key);
                writeln!(out, "📸 スクリーンショットのパスを1行ずつ入力し、最後に `done` と入力してください")?;
            }
            SessionCommand::Cancel => {
                if registry.cancel(key) {
                    writeln!(out, "セッションを破棄しました")?;
                }
            }
            SessionCommand::Image(path) => {
                let bytes = match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("{} を読み込めません: {}", path.display(), e);
                        writeln!(out, "⚠️ 読み込めません: {}", path.display())?;
                        continue;
                    }
                };
                match registry.add_image(key, bytes) {
                    AddOutcome::Added { count } => writeln!(out, "✔ {}枚目を受け付けました", count)?,
                    AddOutcome::Duplicate => writeln!(out, "同じ画像は追加済みです")?,
                    AddOutcome::NoSession => {}
                }
            }
            SessionCommand::Done => match registry.finish(key, engine, reconciler) {
                FinishOutcome::NoSession => {}
                FinishOutcome::NoImages => writeln!(out, "{}", NO_IMAGES_MESSAGE)?,
                FinishOutcome::Report(result) => writeln!(out, "{}", result.report)?,
            },
        }
    }

    Ok(())
}
