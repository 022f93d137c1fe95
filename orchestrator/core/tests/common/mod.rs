// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use deployer_core::domain::engine::{
    ContainerDetails, ContainerEngine, ContainerStatus, EngineError, LaunchSpec, NetworkOptions,
};
use deployer_core::domain::instance::{
    AllocatedPort, CustomProperty, EnumTag, InstanceDescriptor,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeContainer {
    pub id: String,
    pub spec: LaunchSpec,
    pub status: ContainerStatus,
}

#[derive(Default)]
pub struct FakeState {
    pub containers: HashMap<String, FakeContainer>,
    pub images: HashSet<String>,
    pub networks: Vec<String>,
    pub calls: Vec<String>,
    pub image_in_use: bool,
    pub network_create_conflict: bool,
    pub network_remove_fails: bool,
    pub next_id: u32,
}

/// In-memory container engine recording every call it receives.
#[derive(Default)]
pub struct FakeEngine {
    pub state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn with_images(images: &[&str]) -> Self {
        let engine = Self::default();
        engine
            .state
            .lock()
            .unwrap()
            .images
            .extend(images.iter().map(|i| i.to_string()));
        engine
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(verb)).count()
    }

    pub fn spec_of(&self, name: &str) -> Option<LaunchSpec> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .map(|c| c.spec.clone())
    }

    pub fn status_of(&self, name: &str) -> Option<ContainerStatus> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .map(|c| c.status)
    }

    pub fn set_status(&self, name: &str, status: ContainerStatus) {
        if let Some(c) = self.state.lock().unwrap().containers.get_mut(name) {
            c.status = status;
        }
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn find<'a>(
    containers: &'a mut HashMap<String, FakeContainer>,
    id: &str,
) -> Result<&'a mut FakeContainer, EngineError> {
    containers
        .values_mut()
        .find(|c| c.spec.name == id || c.id == id)
        .ok_or_else(|| EngineError::NotFound(format!("no such container: {}", id)))
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn create_container(&self, spec: &LaunchSpec) -> Result<String, EngineError> {
        self.record(format!("create {}", spec.name));
        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(&spec.name) {
            return Err(EngineError::AlreadyExists(spec.name.clone()));
        }
        if !state.images.contains(&spec.image) {
            return Err(EngineError::ImageNotFound(spec.image.clone()));
        }
        state.next_id += 1;
        let id = format!("cid{}", state.next_id);
        state.containers.insert(
            spec.name.clone(),
            FakeContainer {
                id: id.clone(),
                spec: spec.clone(),
                status: ContainerStatus::Created,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("start {}", id));
        let mut state = self.state.lock().unwrap();
        find(&mut state.containers, id)?.status = ContainerStatus::Running;
        Ok(())
    }

    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError> {
        self.record(format!("stop {} {}", id, timeout.as_secs()));
        let mut state = self.state.lock().unwrap();
        find(&mut state.containers, id)?.status = ContainerStatus::Exited;
        Ok(())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), EngineError> {
        self.record(format!("remove_container {} {}", id, remove_volumes));
        let mut state = self.state.lock().unwrap();
        let name = find(&mut state.containers, id)?.spec.name.clone();
        state.containers.remove(&name);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        let mut state = self.state.lock().unwrap();
        let c = find(&mut state.containers, id)?;
        Ok(ContainerDetails {
            id: c.id.clone(),
            name: c.spec.name.clone(),
            status: c.status,
            pid: 4242,
            log_path: format!("/var/lib/docker/containers/{0}/{0}-json.log", c.id),
        })
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        self.record(format!("pull {}", reference));
        self.state.lock().unwrap().images.insert(reference.to_string());
        Ok(())
    }

    async fn remove_image(&self, reference: &str, prune_children: bool) -> Result<(), EngineError> {
        self.record(format!("remove_image {} {}", reference, prune_children));
        let mut state = self.state.lock().unwrap();
        if state.image_in_use {
            return Err(EngineError::InUse(reference.to_string()));
        }
        state.images.remove(reference);
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn create_network(&self, name: &str, options: &NetworkOptions) -> Result<(), EngineError> {
        self.record(format!("create_network {} {}", name, options.driver));
        let mut state = self.state.lock().unwrap();
        if state.network_create_conflict {
            state.networks.push(name.to_string());
            return Err(EngineError::AlreadyExists(name.to_string()));
        }
        state.networks.push(name.to_string());
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("remove_network {}", name));
        let mut state = self.state.lock().unwrap();
        if state.network_remove_fails {
            return Err(EngineError::Api("network has active endpoints".to_string()));
        }
        state.networks.retain(|n| n != name);
        Ok(())
    }

    async fn server_version(&self) -> Result<String, EngineError> {
        Ok("24.0.7".to_string())
    }
}

/// Descriptor for tenant `acme`, app `shop`, version `v1`, instance `i1`.
pub fn descriptor(props: &[(&str, &[&str])]) -> InstanceDescriptor {
    let mut d = InstanceDescriptor::default();
    d.platform.platform_version = "7.0.0".to_string();
    d.workload.source = "/acme/shop/v1".to_string();
    d.workload.application_alias = "shop".to_string();
    d.workload.version_alias = "v1".to_string();
    d.workload.bundle_name = "web".to_string();
    d.workload.instance_id = "i1".to_string();
    d.workload.custom_props = props
        .iter()
        .map(|(name, values)| CustomProperty {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        })
        .collect();
    d
}

pub fn http_port(name: &str, port: i64) -> AllocatedPort {
    AllocatedPort {
        name: name.to_string(),
        port,
        port_type: EnumTag {
            enum_class: "PortType".to_string(),
            value: "Http".to_string(),
        },
    }
}
