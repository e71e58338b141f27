//! Visitrack - affiliate visit tracking core
//!
//! Records affiliate visits, answers filtered visit queries through a
//! generation-invalidated cache, and keeps each affiliate's visit counter
//! in step with inserts and reassignments.
//!
//! # Features
//! - **redis-cache**: Redis cache backend, shares the generation token across instances (default)
//!
//! # Architecture
//! - `query`: request shape, predicate building and query fingerprints
//! - `cache`: pluggable cache backends and the generation-token cache
//! - `storage`: SeaORM visit store (SQLite, MySQL, PostgreSQL)
//! - `affiliates`: affiliate existence checks and visit counters
//! - `services`: `VisitService` facade, query service, mutations and hooks
//! - `config`: static configuration (TOML + environment)
//! - `system`: logging setup

pub mod affiliates;
pub mod cache;
pub mod config;
pub mod errors;
pub mod query;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

pub use errors::{Result, VisitError};
pub use query::VisitQuery;
pub use services::{QueryOutput, VisitService};
pub use storage::{NewVisit, Visit, VisitChanges};
