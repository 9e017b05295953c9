//! Development server: static serving, live reload and source watching

pub mod reload;
pub mod server;
pub mod watch;

pub use reload::ReloadHub;
pub use server::DevServer;
pub use watch::{ChangePlan, DevSession, SourceWatcher, WatchRule};
