//! # zap-router
//!
//! Routing and registry engine for "zap" operations in front of a
//! constant-product AMM: convert a single asset (native coin or token)
//! into a liquidity-pool position, or back out of one, in a single call.
//!
//! The crate is the on-venue core only. The AMM itself (pairs, factory,
//! router, fungible tokens) is an external collaborator reached through the
//! [`exchange::Exchange`] trait; [`mocks::MockExchange`] provides a complete
//! in-memory venue for tests and demos.
//!
//! Main pieces:
//! - [`registry`]: swap-delete ordered token/intermediate registries and the
//!   pool registry with its resumable factory sync cursor
//! - [`routing`]: preset-path storage and the first-match path resolver
//! - [`zap`]: the `Zap` orchestrator: admin, query and transactional calls
//! - [`estimator`]: read-only simulation used to derive minimum-out bounds
//! - [`math`]: the shared constant-product fee formulas

pub mod config;
pub mod error;
pub mod estimator;
pub mod events;
pub mod exchange;
pub mod math;
pub mod mocks;
pub mod registry;
pub mod routing;
pub mod zap;

pub use config::ZapConfig;
pub use error::ZapError;
pub use estimator::{Estimator, ZapInLpEstimate};
pub use events::ZapEvent;
pub use exchange::{Exchange, NATIVE};
pub use zap::Zap;
