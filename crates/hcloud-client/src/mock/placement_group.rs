//! Placement group operations for MockHcloudClient

use super::MockHcloudClient;
use crate::error::HcloudError;
use crate::models::*;

pub async fn get_placement_group_by_name(client: &MockHcloudClient, name: &str) -> Result<Option<PlacementGroup>, HcloudError> {
    client.enter("get_placement_group_by_name").await?;
    Ok(client
        .placement_groups
        .lock()
        .unwrap()
        .values()
        .find(|g| g.name == name)
        .cloned())
}

pub async fn get_placement_group(client: &MockHcloudClient, id: i64) -> Result<Option<PlacementGroup>, HcloudError> {
    client.enter("get_placement_group").await?;
    Ok(client.placement_groups.lock().unwrap().get(&id).cloned())
}

pub async fn create_placement_group(client: &MockHcloudClient, request: CreatePlacementGroupRequest) -> Result<PlacementGroup, HcloudError> {
    client.enter("create_placement_group").await?;
    let mut groups = client.placement_groups.lock().unwrap();
    if groups.values().any(|g| g.name == request.name) {
        return Err(HcloudError::Api {
            code: "uniqueness_error".to_string(),
            message: format!("placement group name {} is already used", request.name),
        });
    }

    let group = PlacementGroup {
        id: client.next_id(),
        name: request.name,
        group_type: request.group_type,
        servers: Vec::new(),
        labels: request.labels,
    };
    groups.insert(group.id, group.clone());
    Ok(group)
}

pub async fn delete_placement_group(client: &MockHcloudClient, id: i64) -> Result<(), HcloudError> {
    client.enter("delete_placement_group").await?;
    client
        .placement_groups
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| HcloudError::NotFound(format!("placement group {} not found", id)))
}
