// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Network Scope
//!
//! Derives the engine network name and the container's endpoint alias from
//! the configured scope. Names are a pure function of
//! (scope, tenant, application alias, version alias, configured name).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements scoped network naming

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkScope {
    /// Any scope value other than app/tenant/global.
    Container,
    App,
    Tenant,
    Global,
}

impl NetworkScope {
    /// `None` when no scope is configured.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.to_lowercase().as_str() {
            "app" => Self::App,
            "tenant" => Self::Tenant,
            "global" => Self::Global,
            _ => Self::Container,
        })
    }
}

impl fmt::Display for NetworkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "container"),
            Self::App => write!(f, "app"),
            Self::Tenant => write!(f, "tenant"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Identity segments a network name is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity<'a> {
    pub tenant: &'a str,
    pub app_alias: &'a str,
    pub version_alias: &'a str,
    pub bundle_name: &'a str,
    pub configured_name: &'a str,
}

/// Resolved network placement for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    /// Doubles as the engine network ID.
    pub name: String,
    pub alias: String,
}

impl NetworkIdentity<'_> {
    pub fn network_name(&self, scope: NetworkScope) -> String {
        let configured = self.configured_name.to_lowercase();
        let parts: Vec<&str> = match scope {
            NetworkScope::App => vec!["app", self.tenant, self.app_alias, self.version_alias],
            NetworkScope::Tenant => vec!["tenant", self.tenant, configured.as_str()],
            // Joined as "global-" + "-" + name; the double hyphen is kept for existing networks.
            NetworkScope::Global => vec!["global-", configured.as_str()],
            NetworkScope::Container => vec![configured.as_str()],
        };
        parts.join("-")
    }

    pub fn alias(&self, scope: NetworkScope) -> String {
        match scope {
            NetworkScope::App => self.bundle_name.to_string(),
            _ => [self.app_alias, self.version_alias, self.bundle_name].join("-"),
        }
    }

    pub fn attachment(&self, scope: NetworkScope) -> NetworkAttachment {
        NetworkAttachment {
            name: self.network_name(scope),
            alias: self.alias(scope),
        }
    }
}
