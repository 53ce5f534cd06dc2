// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod connection_file;
pub mod event_bus;
pub mod hadoop_conf;
pub mod process;
pub mod resource_manager;

pub use connection_file::ConnectionFileReceiver;
pub use event_bus::EventBus;
pub use process::TokioProcessLauncher;
pub use resource_manager::ResourceManagerClient;
