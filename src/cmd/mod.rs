//! CLI command implementations.
//!
//! | Module   | Commands handled   |
//! |----------|--------------------|
//! | `board`  | `Board`, `Move`    |
//! | `config` | `Config`           |

pub mod board;
pub mod config;

pub use board::{cmd_board, cmd_move};
pub use config::{cmd_config, cmd_config_init};
