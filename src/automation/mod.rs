//! Pull request lifecycle automation.
//!
//! Opens pull requests from branches with generated metadata, reviews open
//! pull requests and posts inline comments, derives approval status from
//! review history, and mirrors everything into a row-oriented tracking
//! store. A scheduler repeats the review-then-track workflow until
//! cancelled. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
