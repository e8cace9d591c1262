//! Read-only catalogue operations for MockHcloudClient
//!
//! Images, datacenters, server types and locations

use super::MockHcloudClient;
use crate::error::HcloudError;
use crate::models::*;

pub async fn list_images(client: &MockHcloudClient, opts: &ImageListOpts) -> Result<Vec<Image>, HcloudError> {
    client.enter("list_images").await?;
    Ok(client
        .images
        .lock()
        .unwrap()
        .iter()
        .filter(|i| opts.image_type.is_none_or(|t| i.image_type == t))
        .filter(|i| opts.architecture.is_none_or(|a| i.architecture == a))
        .filter(|i| opts.include_deprecated || i.deprecated.is_none())
        .cloned()
        .collect())
}

pub async fn get_datacenter(client: &MockHcloudClient, name: &str) -> Result<Option<Datacenter>, HcloudError> {
    client.enter("get_datacenter").await?;
    Ok(client.datacenters.lock().unwrap().iter().find(|d| d.name == name).cloned())
}

pub async fn list_server_types(client: &MockHcloudClient) -> Result<Vec<ServerType>, HcloudError> {
    client.enter("list_server_types").await?;
    Ok(client.server_types.lock().unwrap().clone())
}

pub async fn get_location(client: &MockHcloudClient, name: &str) -> Result<Option<Location>, HcloudError> {
    client.enter("get_location").await?;
    Ok(client.locations.lock().unwrap().iter().find(|l| l.name == name).cloned())
}
