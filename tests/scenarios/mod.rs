//! End-to-end scenarios over a generated site

mod build_output;
mod rebuild;
mod transformations;
mod watch_reload;
