//! 段階的なワーカーキュー（inbox → raw → results）

pub mod stage;
pub mod worker;

pub use stage::{text_key, Stage, StageQueue};
pub use worker::{extraction_tick, parsing_tick, run_extraction_loop, run_parsing_loop, TickReport};
