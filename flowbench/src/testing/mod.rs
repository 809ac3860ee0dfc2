//! Testing utilities for flowbench pipelines.
//!
//! This module provides:
//! - Scripted sources, transforms and sinks
//! - An in-memory writer for console sinks
//! - Assertions over run metrics

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_counter, assert_no_hard_fail, assert_order_preserved};
pub use fixtures::{order_event, order_payload, SharedBuffer};
pub use mocks::{CollectingSink, DropWhere, FailTimes, FailingTransform, RecordingTransform, VecSource};
