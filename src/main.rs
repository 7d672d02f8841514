use anyhow::Context;
use clap::Parser;
use leaderboard_ocr::{cli, config, error, history, ocr, queue, scanner, session};
use cli::{Cli, Commands};
use config::{Config, OcrBackend};
use history::History;
use leaderboard_common::Reconciliation;
use queue::{run_extraction_loop, run_parsing_loop, Stage, StageQueue};
use session::{ImageBatch, SessionRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // `config --init -c <新しいパス>` では既定値から始める
    let config = match (&cli.command, &cli.config) {
        (Commands::Config { init: true, .. }, Some(path)) if !path.exists() => Config::default(),
        _ => Config::load(cli.config.as_deref())?,
    };

    match cli.command {
        Commands::Watch { queue, interval } => {
            println!("👀 leaderboard-ocr - キュー監視\n");

            let reconciler = Arc::new(config.build_reconciler()?);
            let engine = ocr::engine_from_config(&config.ocr)?;
            let root = queue.unwrap_or_else(|| config.queue_root.clone());
            let stage_queue = Arc::new(StageQueue::open(&root)?);
            let interval = Duration::from_secs(interval.unwrap_or(config.poll_interval_secs).max(1));
            let history = config.history_file.as_deref().map(History::new);

            for stage in Stage::ALL {
                println!("  {:<8} {}", stage, stage_queue.dir(stage).display());
            }
            println!("  間隔     {}秒\n", interval.as_secs());

            let runtime = tokio::runtime::Runtime::new().context("tokioランタイムを起動できません")?;
            runtime.block_on(async {
                let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

                let extraction = tokio::spawn(run_extraction_loop(
                    Arc::clone(&stage_queue),
                    Arc::clone(&engine),
                    interval,
                    shutdown_rx.clone(),
                ));
                let parsing = tokio::spawn(run_parsing_loop(
                    Arc::clone(&stage_queue),
                    Arc::clone(&reconciler),
                    history,
                    interval,
                    shutdown_rx,
                ));

                tokio::signal::ctrl_c().await?;
                println!("\n停止中...");
                let _ = shutdown_tx.send(true);

                let _ = tokio::join!(extraction, parsing);
                Ok::<_, anyhow::Error>(())
            })?;
            drop(runtime);

            println!("✅ 終了しました");
        }

        Commands::Reconcile { images, output } => {
            println!("📸 leaderboard-ocr - 画像集計\n");

            let reconciler = config.build_reconciler()?;
            let engine = ocr::engine_from_config(&config.ocr)?;

            println!("[1/2] 画像を読み込み中...");
            let files = scanner::collect_images(&images)?;
            if files.is_empty() {
                return Err(error::LeaderboardError::FileNotFound("画像がありません".into()).into());
            }

            let mut batch = ImageBatch::new();
            for file in &files {
                let bytes = std::fs::read(&file.path)
                    .with_context(|| format!("{} を読み込めません", file.path.display()))?;
                if !batch.push(bytes) {
                    log::info!("同一画像をスキップ: {}", file.file_name);
                }
            }
            println!("✔ {}枚（重複除外後 {}枚）\n", files.len(), batch.len());

            println!("[2/2] OCR・集計中...");
            let result = batch.reconcile(engine.as_ref(), &reconciler);
            print_result(&result, output.as_deref())?;
        }

        Commands::Parse { files, output } => {
            println!("📄 leaderboard-ocr - テキスト集計\n");

            let reconciler = config.build_reconciler()?;
            let blocks = files
                .iter()
                .map(|path| {
                    if !path.is_file() {
                        return Err(error::LeaderboardError::FileNotFound(
                            path.display().to_string(),
                        ));
                    }
                    Ok(std::fs::read_to_string(path)?)
                })
                .collect::<error::Result<Vec<String>>>()?;

            let result = reconciler.run(&blocks);
            print_result(&result, output.as_deref())?;
        }

        Commands::Session { key } => {
            println!("💬 leaderboard-ocr - 対話セッション\n");

            let reconciler = config.build_reconciler()?;
            let engine = ocr::engine_from_config(&config.ocr)?;
            let mut registry = SessionRegistry::new(Duration::from_secs(config.session_ttl_secs));

            let stdin = std::io::stdin();
            session::run_interactive(
                stdin.lock(),
                std::io::stdout(),
                &key,
                &mut registry,
                engine.as_ref(),
                &reconciler,
            )?;
        }

        Commands::Enqueue { images, queue } => {
            let root = queue.unwrap_or_else(|| config.queue_root.clone());
            let stage_queue = StageQueue::open(&root)?;

            for image in scanner::collect_images(&images)? {
                let bytes = std::fs::read(&image.path)?;
                let key = stage_queue.unique_key(Stage::Inbox, &image.file_name);
                stage_queue.write(Stage::Inbox, &key, &bytes)?;
                println!("✔ inbox/{}", key);
            }
        }

        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("✔ 設定を保存しました: {}", path.display());
            }

            if show || !init {
                print_config(&config, cli.config.as_deref());
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .filter(Some("leaderboard_ocr"), level)
        .filter(Some("leaderboard_common"), level)
        .init();
}

fn print_result(result: &Reconciliation, output: Option<&Path>) -> anyhow::Result<()> {
    println!(
        "✔ {}ブロック / 候補 {}件 / {}名\n",
        result.block_count,
        result.detections,
        result.board.len()
    );
    println!("{}", result.report);

    if let Some(output) = output {
        std::fs::write(output, &result.report)
            .with_context(|| format!("{} に書き込めません", output.display()))?;
        println!("\n✔ レポートを保存: {}", output.display());
    }
    Ok(())
}

fn print_config(config: &Config, path: Option<&Path>) {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| Config::config_path().ok())
        .unwrap_or_else(|| PathBuf::from("?"));

    println!("設定: {}", path.display());
    println!("  名簿: {}", config.roster_path.display());
    println!(
        "  エイリアス: {}",
        config
            .alias_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "（なし）".into())
    );
    println!("  キュー: {}", config.queue_root.display());
    println!("  ポーリング間隔: {}秒", config.poll_interval_secs);
    println!("  表示件数: {}", config.report_cap);
    println!("  最大文字数: {}", config.max_report_chars);
    println!("  セッション期限: {}秒", config.session_ttl_secs);
    println!(
        "  履歴: {}",
        config
            .history_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "（なし）".into())
    );
    println!("  OCR: {}", config.ocr.backend);
    if config.ocr.backend == OcrBackend::Vision {
        println!(
            "  Vision APIキー: {}",
            if config.ocr.get_vision_api_key().is_some() { "設定済み" } else { "未設定" }
        );
    }
}
