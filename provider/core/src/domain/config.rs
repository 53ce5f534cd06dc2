// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Configuration
//
// Provider-wide settings for the YARN kernel provider:
// - ResourceManager endpoints (primary + HA alternate) and SPNEGO security
// - Lifecycle timings (poll interval, kill confirmation attempts, waits)
// - Where connection files appear and where Hadoop configuration lives
//
// Each kernel may override the endpoint settings through its own
// `KernelLifecycleConfig`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::cluster::{AuthStrategy, KerberosCredentials};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Primary ResourceManager URL. When neither endpoint is set, endpoints
    /// are discovered from the local Hadoop configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yarn_endpoint: Option<String>,

    /// Alternate ResourceManager URL for HA setups. Ignored without a primary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_yarn_endpoint: Option<String>,

    /// Use Kerberos/SPNEGO negotiated auth against the ResourceManager
    #[serde(default)]
    pub yarn_endpoint_security_enabled: bool,

    /// SPNEGO token (supports "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spnego_token: Option<String>,

    #[serde(default)]
    pub lifecycle: LifecycleTimings,

    /// Directory where kernel connection files are written
    #[serde(default = "default_connection_dir")]
    pub connection_dir: PathBuf,

    /// Overrides $HADOOP_CONF_DIR for endpoint discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hadoop_conf_dir: Option<PathBuf>,

    /// Per-request timeout for ResourceManager calls
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleTimings {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Kill confirmation queries before falling back to the local process
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Minimum shutdown wait for YARN kernels
    #[serde(default = "default_shutdown_wait_time", with = "humantime_serde")]
    pub shutdown_wait_time: Duration,

    #[serde(default = "default_launch_timeout", with = "humantime_serde")]
    pub launch_timeout: Duration,
}

/// Per-kernel overrides carried by the kernel's own configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelLifecycleConfig {
    #[serde(default)]
    pub yarn_endpoint: Option<String>,
    #[serde(default)]
    pub alt_yarn_endpoint: Option<String>,
    #[serde(default)]
    pub yarn_endpoint_security_enabled: Option<bool>,
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_max_poll_attempts() -> u32 {
    10
}

fn default_shutdown_wait_time() -> Duration {
    Duration::from_secs(15)
}

fn default_launch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connection_dir() -> PathBuf {
    std::env::temp_dir().join("ykp-connections")
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            shutdown_wait_time: default_shutdown_wait_time(),
            launch_timeout: default_launch_timeout(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            yarn_endpoint: None,
            alt_yarn_endpoint: None,
            yarn_endpoint_security_enabled: false,
            spnego_token: None,
            lifecycle: LifecycleTimings::default(),
            connection_dir: default_connection_dir(),
            hadoop_conf_dir: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. YKP_CONFIG_PATH environment variable
    /// 2. ./ykp-config.yaml (working directory)
    /// 3. ~/.ykp/config.yaml (user home)
    /// 4. /etc/ykp/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("YKP_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./ykp-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ykp").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/ykp/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("YKP_YARN_ENDPOINT").filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: YKP_YARN_ENDPOINT={}", val);
            self.yarn_endpoint = Some(val);
        }

        if let Some(val) = lookup("YKP_ALT_YARN_ENDPOINT").filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: YKP_ALT_YARN_ENDPOINT={}", val);
            self.alt_yarn_endpoint = Some(val);
        }

        if let Some(val) = lookup("YKP_YARN_ENDPOINT_SECURITY_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.yarn_endpoint_security_enabled = true,
                "false" | "0" | "no" | "off" => self.yarn_endpoint_security_enabled = false,
                _ => tracing::warn!(
                    "Invalid value for YKP_YARN_ENDPOINT_SECURITY_ENABLED: '{}'. Expected true/false. Ignoring.",
                    val
                ),
            }
        }

        if let Some(secs) = parse_seconds(&lookup, "EG_POLL_INTERVAL") {
            self.lifecycle.poll_interval = secs;
        }

        if let Some(val) = lookup("EG_MAX_POLL_ATTEMPTS") {
            match val.trim().parse::<u32>() {
                Ok(n) => self.lifecycle.max_poll_attempts = n,
                Err(_) => tracing::warn!("Invalid value for EG_MAX_POLL_ATTEMPTS: '{}'. Ignoring.", val),
            }
        }

        if let Some(secs) = parse_seconds(&lookup, "EG_YARN_SHUTDOWN_WAIT_TIME") {
            self.lifecycle.shutdown_wait_time = secs;
        }

        if let Some(secs) = parse_seconds(&lookup, "KERNEL_LAUNCH_TIMEOUT") {
            self.lifecycle.launch_timeout = secs;
        }

        if let Some(val) = lookup("HADOOP_CONF_DIR").filter(|v| !v.is_empty()) {
            if self.hadoop_conf_dir.is_none() {
                self.hadoop_conf_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lifecycle.poll_interval.is_zero() {
            anyhow::bail!("lifecycle.poll_interval must be greater than zero");
        }

        if self.lifecycle.launch_timeout < self.lifecycle.poll_interval {
            anyhow::bail!(
                "lifecycle.launch_timeout ({:?}) must not be shorter than lifecycle.poll_interval ({:?})",
                self.lifecycle.launch_timeout,
                self.lifecycle.poll_interval
            );
        }

        if self.alt_yarn_endpoint.is_some() && self.yarn_endpoint.is_none() {
            tracing::warn!("alt_yarn_endpoint is set without yarn_endpoint and will be ignored");
        }

        for endpoint in [&self.yarn_endpoint, &self.alt_yarn_endpoint].into_iter().flatten() {
            url::Url::parse(endpoint)
                .map_err(|e| anyhow::anyhow!("Invalid ResourceManager URL '{}': {}", endpoint, e))?;
        }

        if self.yarn_endpoint_security_enabled && self.spnego_token.is_none() {
            anyhow::bail!("yarn_endpoint_security_enabled requires spnego_token");
        }

        Ok(())
    }

    /// Merge a kernel's overrides on top of the provider settings.
    pub fn for_kernel(&self, kernel: &KernelLifecycleConfig) -> ProviderConfig {
        let mut merged = self.clone();
        if kernel.yarn_endpoint.is_some() {
            merged.yarn_endpoint = kernel.yarn_endpoint.clone();
        }
        if kernel.alt_yarn_endpoint.is_some() {
            merged.alt_yarn_endpoint = kernel.alt_yarn_endpoint.clone();
        }
        if let Some(enabled) = kernel.yarn_endpoint_security_enabled {
            merged.yarn_endpoint_security_enabled = enabled;
        }
        merged
    }

    /// Explicitly configured endpoints, primary first. `None` means defer to
    /// the local Hadoop configuration.
    pub fn configured_endpoints(&self) -> Option<Vec<String>> {
        let primary = self.yarn_endpoint.as_ref().filter(|e| !e.trim().is_empty())?;
        let mut endpoints = vec![primary.clone()];
        if let Some(alt) = self.alt_yarn_endpoint.as_ref().filter(|e| !e.trim().is_empty()) {
            endpoints.push(alt.clone());
        }
        Some(endpoints)
    }

    pub fn auth_strategy(&self) -> anyhow::Result<AuthStrategy> {
        if !self.yarn_endpoint_security_enabled {
            return Ok(AuthStrategy::None);
        }

        let raw = self
            .spnego_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("yarn_endpoint_security_enabled requires spnego_token"))?;

        let token = match raw.strip_prefix("env:") {
            Some(var) => std::env::var(var)
                .map_err(|_| anyhow::anyhow!("SPNEGO token variable '{}' is not set", var))?,
            None => raw.to_string(),
        };

        Ok(AuthStrategy::Kerberos(KerberosCredentials { negotiate_token: token }))
    }
}

fn parse_seconds<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(key)?;
    match val.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => {
            tracing::info!("Environment override: {}={}", key, val);
            Some(Duration::from_secs_f64(secs))
        }
        _ => {
            tracing::warn!("Invalid value for {}: '{}'. Expected seconds. Ignoring.", key, val);
            None
        }
    }
}
