//! Network operations for MockHcloudClient

use super::MockHcloudClient;
use crate::error::HcloudError;
use crate::models::*;

pub async fn get_network_by_name(client: &MockHcloudClient, name: &str) -> Result<Option<Network>, HcloudError> {
    client.enter("get_network_by_name").await?;
    Ok(client.networks.lock().unwrap().values().find(|n| n.name == name).cloned())
}

pub async fn get_network(client: &MockHcloudClient, id: i64) -> Result<Option<Network>, HcloudError> {
    client.enter("get_network").await?;
    Ok(client.networks.lock().unwrap().get(&id).cloned())
}

pub async fn create_network(client: &MockHcloudClient, request: CreateNetworkRequest) -> Result<Network, HcloudError> {
    client.enter("create_network").await?;
    let mut networks = client.networks.lock().unwrap();
    if networks.values().any(|n| n.name == request.name) {
        return Err(HcloudError::Api {
            code: "uniqueness_error".to_string(),
            message: format!("network name {} is already used", request.name),
        });
    }

    let network = Network {
        id: client.next_id(),
        name: request.name,
        ip_range: request.ip_range,
        subnets: request.subnets,
        labels: request.labels,
    };
    networks.insert(network.id, network.clone());
    Ok(network)
}

pub async fn delete_network(client: &MockHcloudClient, id: i64) -> Result<(), HcloudError> {
    client.enter("delete_network").await?;
    client
        .networks
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| HcloudError::NotFound(format!("network {} not found", id)))
}
