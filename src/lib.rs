pub mod api;
pub mod charts;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod reconciler;
pub mod state;
pub mod version;
pub mod view;
pub mod viewport;

pub use nodenexus_common as common;
