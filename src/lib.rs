extern crate data_encoding;
extern crate glob;
#[macro_use]
extern crate log;
extern crate md5;

pub mod change;
pub mod filter;
pub mod fs_interaction;
pub mod monitor;
pub mod pender;
pub mod provider;
pub mod synchronizer;
pub mod workspace;

pub use change::{ItemType, OfflineChange, OfflineChangeType};
pub use filter::{AcceptAllFilter, OfflineSynchronizerFilter, PatternFilter};
pub use pender::OfflinePender;
pub use provider::{OfflineSynchronizerProvider, PathListProvider};
pub use synchronizer::{
    DefaultOfflineSynchronizer, OfflineSynchronizer, OfflineSynchronizerMethod, SynchronizerError,
};
