// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::domain::application::KernelId;

/// Where the ApplicationMaster landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedHost {
    pub host: String,
    pub ip: IpAddr,
}

/// Host-side collaborator that knows when the kernel's connection info
/// (connection file or credentials) has become available.
#[async_trait]
pub trait ConnectionInfoReceiver: Send + Sync {
    async fn receive_connection_info(&self, kernel_id: &KernelId, assigned: &AssignedHost) -> bool;
}
