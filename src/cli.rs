use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "leaderboard-ocr")]
#[command(about = "スクリーンショットのOCRからリーダーボードを再構成するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時: ~/.config/leaderboard-ocr/config.json）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// キューを監視して inbox → raw → results を処理し続ける（Ctrl-Cで終了）
    Watch {
        /// キューのルート（省略時は設定の queue_root）
        #[arg(short, long)]
        queue: Option<PathBuf>,

        /// ポーリング間隔（秒）
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// 画像をOCRして1バッチとして集計
    Reconcile {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// レポートの出力先（省略時は標準出力のみ）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// OCR済みテキストを1バッチとして集計
    Parse {
        /// テキストファイル
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// レポートの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対話セッション（start / 画像パス / done / cancel / quit）
    Session {
        /// セッションのキー
        #[arg(short, long, default_value = "cli")]
        key: String,
    },

    /// 画像を inbox に投入
    Enqueue {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// キューのルート（省略時は設定の queue_root）
        #[arg(short, long)]
        queue: Option<PathBuf>,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定値で設定ファイルを作成
        #[arg(long)]
        init: bool,
    },
}
