//! # OnPoints
//!
//! Multi-tenant plumbing for the OnPoints helpdesk platform: maps incoming
//! requests to tenants by domain, proves subdomain ownership over DNS, and
//! keeps each tenant's user list in step with its Active Directory.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! onpoints = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use onpoints::domain::HickoryTxtResolver;
//! use onpoints::server::{AppState, create_router};
//! use onpoints::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/onpoints.db").unwrap();
//! store.initialize().unwrap();
//!
//! let dns = Arc::new(HickoryTxtResolver::from_system_conf(Duration::from_secs(5)));
//! let state = Arc::new(AppState::new(Arc::new(store), dns));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `agent` (default): the directory sync agent (LDAP reader and HTTP client).
//! - `cli` (default): CLI module. Implies `agent`. Disable with `default-features = false`.

#[cfg(feature = "agent")]
pub mod agent;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;
