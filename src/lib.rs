//! Keeps MCP servers, slash commands, rules and skills consistent across the
//! configuration files of several coding assistants, without disturbing
//! anything the user wrote by hand.

pub mod adapter;
pub mod config;
pub mod document;
mod error;
pub mod logging;
pub mod mcp;
pub mod ownership;
pub mod resource;
pub mod safe_io;
pub mod services;
pub mod settings;

pub use adapter::{
    filter_transports, Adapter, AdapterRegistry, Capabilities, SyncContext, WriteReport,
};
pub use config::{get_app_config_dir, home_dir, read_json_file};
pub use error::AppError;
pub use ownership::{Ledger, Ownership};
pub use resource::{
    validate_name, Command, Resource, ResourceKind, ResourceSet, Rule, Scope, Server, Skill,
    Transport,
};
pub use services::{AdapterOutcome, KindOutcome, SyncReport, SyncService};
pub use settings::{AppSettings, LockMode};
