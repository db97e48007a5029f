//! workbench-lib: fetch, configure and build external source trees
//!
//! This crate provides the pieces behind the `wb` command:
//! - `registry`: the ordered table of build targets
//! - `workspace`: the on-disk root, path resolution and cleanup
//! - `fetch`: idempotent `git clone` of a target's sources
//! - `build`: configure-then-compile child process orchestration
//! - `orchestrate`: per-target state machine and batch reports

pub mod build;
pub mod config;
pub mod consts;
pub mod fetch;
pub mod orchestrate;
pub mod placeholder;
pub mod platform;
pub mod process;
pub mod registry;
pub mod types;
pub mod util;
pub mod workspace;
