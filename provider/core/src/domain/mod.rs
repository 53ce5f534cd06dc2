// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types and collaborator seams for YARN-hosted kernels.

pub mod application;
pub mod cluster;
pub mod config;
pub mod connection;
pub mod events;
pub mod lifecycle;
pub mod process;
