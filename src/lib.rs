//! # Taskboard
//!
//! A dashboard for three kinds of work items: tasks, projects and objectives.
//!
//! ## Pieces
//!
//! - **Collection server** (`tb serve`): a small JSON API over SQLite, one collection
//!   per entity kind, with list, create, patch and delete.
//! - **Entity stores**: client-side caches that talk to the server over HTTP and
//!   keep an `error` message instead of propagating failures.
//! - **Terminal dashboard** (`tb ui`): stat cards, completion sparklines and one
//!   section per kind, each switchable between a table and a card grid. Every item
//!   has an action menu (modify, mark in progress, mark complete, update progress,
//!   delete).
//! - **CLI shortcuts** (`tb list`, `tb add`, `tb update`, `tb complete`, `tb delete`)
//!   over the same stores, for scripting.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the server (creates taskboard.db in the working directory)
//! tb serve
//!
//! # In another terminal
//! tb add project "Launch website" --priority high --due "in 2w"
//! tb ui
//! ```
//!
//! Configuration is read from `$TASKBOARD_CONFIG` or
//! `~/.config/taskboard/config.toml`; see [`config`].

pub mod cli;
pub mod client;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod db;
pub mod entity;
pub mod error;
pub mod fields;
pub mod server;
pub mod stats;
pub mod store;
pub mod tui {
    pub mod app;
    pub mod cards;
    pub mod colors;
    pub mod date_fields;
    pub mod enums;
    pub mod form;
    pub mod input;
    pub mod overlay;
    pub mod popover;
    pub mod run;
    pub mod table;
    pub mod utils;
}
