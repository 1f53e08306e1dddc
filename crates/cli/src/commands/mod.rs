pub mod ask;
pub mod config_cmd;
pub mod puzzles;
