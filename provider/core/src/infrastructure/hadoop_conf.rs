// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ResourceManager discovery from the local Hadoop configuration.
//!
//! Used when no endpoint is configured explicitly. Reads
//! `<conf dir>/yarn-site.xml`, where the conf dir is the configured override,
//! else `$HADOOP_CONF_DIR`, else `/etc/hadoop/conf`.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const DEFAULT_CONF_DIR: &str = "/etc/hadoop/conf";
const HTTP_PORT: u16 = 8088;
const HTTPS_PORT: u16 = 8090;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<property>(.*?)</property>").expect("valid regex"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>\s*(.*?)\s*</name>").expect("valid regex"));
static VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<value>\s*(.*?)\s*</value>").expect("valid regex"));
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

pub fn conf_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    std::env::var("HADOOP_CONF_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_DIR))
}

pub fn discover_endpoints(conf_dir: &Path) -> Result<Vec<String>> {
    let path = conf_dir.join("yarn-site.xml");
    let xml = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read Hadoop configuration: {:?}", path))?;

    let endpoints = endpoints_from_properties(&parse_properties(&xml));
    if endpoints.is_empty() {
        anyhow::bail!("No ResourceManager address found in {:?}", path);
    }
    Ok(endpoints)
}

/// Extract `<property><name/><value/></property>` pairs. Commented-out
/// properties are ignored.
pub fn parse_properties(xml: &str) -> HashMap<String, String> {
    let xml = COMMENT.replace_all(xml, "");
    PROPERTY
        .captures_iter(&xml)
        .filter_map(|cap| {
            let body = cap.get(1)?.as_str();
            let key = NAME.captures(body)?.get(1)?.as_str().to_string();
            let val = VALUE
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((key, val))
        })
        .collect()
}

pub fn endpoints_from_properties(props: &HashMap<String, String>) -> Vec<String> {
    let https = props
        .get("yarn.http.policy")
        .is_some_and(|p| p.eq_ignore_ascii_case("HTTPS_ONLY"));
    let (scheme, address_key, port) = if https {
        ("https", "yarn.resourcemanager.webapp.https.address", HTTPS_PORT)
    } else {
        ("http", "yarn.resourcemanager.webapp.address", HTTP_PORT)
    };

    let ha_enabled = props
        .get("yarn.resourcemanager.ha.enabled")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let addresses: Vec<String> = if ha_enabled {
        props
            .get("yarn.resourcemanager.ha.rm-ids")
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .filter_map(|id| {
                        lookup(props, &format!("{}.{}", address_key, id)).or_else(|| {
                            lookup(props, &format!("yarn.resourcemanager.hostname.{}", id))
                                .map(|host| format!("{}:{}", host, port))
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    } else {
        lookup(props, address_key)
            .or_else(|| {
                lookup(props, "yarn.resourcemanager.hostname").map(|host| format!("{}:{}", host, port))
            })
            .into_iter()
            .collect()
    };

    addresses
        .into_iter()
        .map(|addr| format!("{}://{}", scheme, addr))
        .collect()
}

/// Value of `key` with `${other.key}` references expanded.
fn lookup(props: &HashMap<String, String>, key: &str) -> Option<String> {
    let raw = props.get(key)?.trim();
    if raw.is_empty() {
        return None;
    }
    let expanded = REFERENCE.replace_all(raw, |cap: &regex::Captures| {
        props.get(&cap[1]).cloned().unwrap_or_default()
    });
    Some(expanded.into_owned())
}
