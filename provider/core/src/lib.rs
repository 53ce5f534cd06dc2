// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle management for Jupyter kernels submitted to Hadoop YARN in
//! cluster mode.
//!
//! - `domain`: identities, application states, lifecycle contract, config
//! - `application`: the YARN lifecycle manager and application lookup
//! - `infrastructure`: ResourceManager REST client, local processes, event bus

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{LifecycleCollaborators, SessionSettings, YarnLifecycleManager};
pub use domain::lifecycle::{LifecycleError, LifecycleInfo, Liveness, RemoteProcessLifecycle};
