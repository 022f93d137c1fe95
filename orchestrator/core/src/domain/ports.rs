// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Port Mapping
//!
//! Allocated ports carry the platform-assigned host port and a declared
//! name whose trailing `_`-delimited suffix is the container port
//! (`http_8080` → `8080`). They are turned into `outPort:innerPort` specs
//! and then into the exposed-port set and binding map the engine expects.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::DeployError;
use crate::domain::instance::AllocatedPort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Exposed container ports (`8080/tcp`) and their host bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMap {
    pub exposed: BTreeSet<String>,
    pub bindings: BTreeMap<String, Vec<PortBinding>>,
}

/// `outPort:innerPort` for one allocated port. The inner part is empty when
/// the name has no `_`, which [`parse_port_specs`] rejects.
pub fn port_spec(port: &AllocatedPort) -> String {
    let inner = port
        .name
        .rfind('_')
        .map(|idx| &port.name[idx + 1..])
        .unwrap_or("");
    format!("{}:{}", port.port, inner)
}

/// Parses `[hostIp:]hostPort:containerPort[/proto]` specs.
pub fn parse_port_specs<S: AsRef<str>>(specs: &[S]) -> Result<PortMap, DeployError> {
    let mut map = PortMap::default();
    for spec in specs {
        let spec = spec.as_ref();
        let (addr, proto) = match spec.rsplit_once('/') {
            Some((addr, proto)) => (addr, proto.to_lowercase()),
            None => (spec, "tcp".to_string()),
        };
        if !matches!(proto.as_str(), "tcp" | "udp" | "sctp") {
            return Err(DeployError::config(format!(
                "invalid protocol '{}' in port spec '{}'",
                proto, spec
            )));
        }

        let parts: Vec<&str> = addr.split(':').collect();
        let (host_ip, host_port, container_port) = match parts.as_slice() {
            [container] => ("", "", *container),
            [host, container] => ("", *host, *container),
            [ip, host, container] => (*ip, *host, *container),
            _ => {
                return Err(DeployError::config(format!("invalid port spec '{}'", spec)));
            }
        };

        let container_port = parse_port(container_port, spec)?;
        if !host_port.is_empty() {
            parse_port(host_port, spec)?;
        }

        let key = format!("{}/{}", container_port, proto);
        map.exposed.insert(key.clone());
        map.bindings.entry(key).or_default().push(PortBinding {
            host_ip: host_ip.to_string(),
            host_port: host_port.to_string(),
        });
    }
    Ok(map)
}

fn parse_port(raw: &str, spec: &str) -> Result<u16, DeployError> {
    if raw.is_empty() {
        return Err(DeployError::config(format!("no port specified in '{}'", spec)));
    }
    raw.parse::<u16>()
        .map_err(|_| DeployError::config(format!("invalid port '{}' in spec '{}'", raw, spec)))
}

/// Port map for every allocated port of the instance.
pub fn port_map_for(ports: &[AllocatedPort]) -> Result<PortMap, DeployError> {
    let specs: Vec<String> = ports.iter().map(port_spec).collect();
    parse_port_specs(&specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocated(name: &str, port: i64) -> AllocatedPort {
        AllocatedPort {
            name: name.to_string(),
            port,
            ..Default::default()
        }
    }

    #[test]
    fn test_port_spec_uses_trailing_suffix() {
        assert_eq!(port_spec(&allocated("http_8080", 30010)), "30010:8080");
        assert_eq!(port_spec(&allocated("admin_http_9090", 30011)), "30011:9090");
        assert_eq!(port_spec(&allocated("nosuffix", 30012)), "30012:");
    }

    #[test]
    fn test_single_http_port_mapping() {
        let map = port_map_for(&[allocated("http_8080", 30010)]).unwrap();
        assert_eq!(map.exposed.iter().collect::<Vec<_>>(), vec!["8080/tcp"]);
        assert_eq!(
            map.bindings["8080/tcp"],
            vec![PortBinding {
                host_ip: String::new(),
                host_port: "30010".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_container_port_is_rejected() {
        assert!(port_map_for(&[allocated("nosuffix", 30012)]).is_err());
    }

    #[test]
    fn test_protocol_and_ip_forms() {
        let map = parse_port_specs(&["127.0.0.1:5353:53/udp", "9000"]).unwrap();
        assert!(map.exposed.contains("53/udp"));
        assert!(map.exposed.contains("9000/tcp"));
        assert_eq!(map.bindings["53/udp"][0].host_ip, "127.0.0.1");
        assert_eq!(map.bindings["9000/tcp"][0].host_port, "");
        assert!(parse_port_specs(&["80:http"]).is_err());
        assert!(parse_port_specs(&["80:81/icmp"]).is_err());
    }
}
