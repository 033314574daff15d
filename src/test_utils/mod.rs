//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory implementations of the auth ports for mocking persistence,
//!   email delivery, and rate limiting
//! - A builder for constructing `AppState` with test dependencies

mod app_state_builder;
mod auth_mocks;
mod factories;

pub use app_state_builder::*;
pub use auth_mocks::*;
pub use factories::*;
