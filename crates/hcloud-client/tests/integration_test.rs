//! Integration tests for the hcloud client
//!
//! These tests talk to a live hcloud project.
//! Set HCLOUD_TOKEN (and optionally HCLOUD_ENDPOINT) to run.

use hcloud_client::{
    CreatePlacementGroupRequest, HcloudClient, HcloudClientTrait, ImageListOpts, ImageType,
    PlacementGroupType,
};
use std::collections::BTreeMap;

fn client() -> HcloudClient {
    let token = std::env::var("HCLOUD_TOKEN").expect("HCLOUD_TOKEN environment variable must be set");
    match std::env::var("HCLOUD_ENDPOINT") {
        Ok(endpoint) => HcloudClient::with_endpoint(endpoint, token),
        Err(_) => HcloudClient::new(token),
    }
    .expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires a live hcloud project
async fn test_validate_token() {
    client().validate_token().await.expect("token should be valid");
}

#[tokio::test]
#[ignore]
async fn test_location_has_network_zone() {
    let location = client()
        .get_location("fsn1")
        .await
        .expect("Failed to get location")
        .expect("fsn1 should exist");
    assert_eq!(location.network_zone, "eu-central");
}

#[tokio::test]
#[ignore]
async fn test_list_system_images() {
    let opts = ImageListOpts {
        image_type: Some(ImageType::System),
        ..Default::default()
    };
    let images = client().list_images(&opts).await.expect("Failed to list images");
    assert!(images.iter().all(|i| i.image_type == ImageType::System));
    println!("Found {} system images", images.len());
}

#[tokio::test]
#[ignore]
async fn test_missing_network_is_none() {
    let network = client().get_network(i64::MAX).await.expect("lookup should not fail");
    assert!(network.is_none());
}

#[tokio::test]
#[ignore]
async fn test_placement_group_lifecycle() {
    let client = client();
    let name = format!("hcloud-client-it-{}", std::process::id());

    let group = client
        .create_placement_group(CreatePlacementGroupRequest {
            name: name.clone(),
            group_type: PlacementGroupType::Spread,
            labels: BTreeMap::new(),
        })
        .await
        .expect("Failed to create placement group");

    let found = client
        .get_placement_group_by_name(&name)
        .await
        .expect("Failed to look up placement group");
    assert_eq!(found.map(|g| g.id), Some(group.id));

    client
        .delete_placement_group(group.id)
        .await
        .expect("Failed to delete placement group");
    assert!(client.get_placement_group(group.id).await.unwrap().is_none());
}
