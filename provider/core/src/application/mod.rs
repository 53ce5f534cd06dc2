// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod locator;
pub mod session;
pub mod yarn_lifecycle;

#[cfg(test)]
pub(crate) mod test_support;

pub use locator::ApplicationLocator;
pub use session::{RemoteSession, SessionSettings};
pub use yarn_lifecycle::{LifecycleCollaborators, YarnLifecycleManager};
