//! Segmented WAL
//!
//! - `config`: WAL configuration (WalConfig, WalConfigError)
//! - `naming`: segment file names and directory listing
//! - `bootstrap`: concurrent open/index of existing segments
//! - `manager`: the directory manager (Wal)

mod bootstrap;
pub mod config;
pub mod manager;
pub mod naming;

pub use config::{WalConfig, WalConfigError};
pub use manager::Wal;
