//! Prflow: pull request lifecycle automation.
//!
//! This crate opens pull requests from branches with AI-generated metadata,
//! reviews open pull requests and posts inline comments, tracks approval
//! status against branch protection, and mirrors lifecycle state into a
//! row-oriented tracking store.
//!
//! # Architecture
//!
//! Prflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//! - **Services**: Orchestration and scheduling over the ports
//!
//! # Modules
//!
//! - [`automation`]: Pull request creation, review, approval tracking and
//!   scheduling
//! - [`config`]: TOML and environment configuration

pub mod automation;
pub mod config;
