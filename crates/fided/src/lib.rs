//! fided - Session registry and spawn-notification binding
//!
//! This crate wires the fide core types into a running system:
//! - `registry` - Session registry actor tracking each session's execution record
//! - `inspector` - Package inspectors backing the companion environment
//! - `config` - Layered TOML/environment configuration
//! - `cli` - The `fided` command-line launcher
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          fided                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────┐  register/unregister ┌──────────────┐  │
//! │  │    Launcher      │─────────────────────▶│RegistryActor │  │
//! │  │ (session owner)  │                      │ (records)    │  │
//! │  └────────┬─────────┘                      └──────▲───────┘  │
//! │           │ spawn                                 │          │
//! │           ▼                                       │ bind     │
//! │  ┌──────────────────┐  on_process_spawned  ┌──────┴───────┐  │
//! │  │  Child process   │─────────────────────▶│RegistryHandle│  │
//! │  │ (+ companion env)│                      │  (observer)  │  │
//! │  └──────────────────┘                      └──────────────┘  │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cli;
pub mod config;
pub mod inspector;
pub mod registry;
