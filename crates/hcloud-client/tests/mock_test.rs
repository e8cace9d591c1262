//! Behaviour of the in-memory mock that controller tests rely on

use hcloud_client::{
    CreateNetworkRequest, HcloudClientTrait, MockHcloudClient, NetworkSubnet, NetworkSubnetType,
};
use std::collections::BTreeMap;

fn network_request(name: &str) -> CreateNetworkRequest {
    CreateNetworkRequest {
        name: name.to_string(),
        ip_range: "10.250.0.0/16".to_string(),
        subnets: vec![NetworkSubnet {
            subnet_type: NetworkSubnetType::Cloud,
            ip_range: "10.250.0.0/16".to_string(),
            network_zone: "eu-central".to_string(),
            gateway: None,
        }],
        labels: BTreeMap::new(),
    }
}

#[tokio::test]
async fn test_create_then_lookup_by_name() {
    let mock = MockHcloudClient::new();
    let created = mock.create_network(network_request("shoot--a")).await.unwrap();

    let found = mock.get_network_by_name("shoot--a").await.unwrap();
    assert_eq!(found, Some(created));
    assert_eq!(mock.call_count("create_network"), 1);
    assert_eq!(mock.call_count("get_network_by_name"), 1);
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let mock = MockHcloudClient::new();
    mock.create_network(network_request("shoot--a")).await.unwrap();
    let err = mock.create_network(network_request("shoot--a")).await.unwrap_err();
    assert!(err.to_string().contains("uniqueness_error"));
}

#[tokio::test]
async fn test_injected_failure() {
    let mock = MockHcloudClient::new();
    mock.fail_operation("get_network_by_name", "unavailable", "maintenance");
    assert!(mock.get_network_by_name("x").await.is_err());

    mock.clear_failure("get_network_by_name");
    assert!(mock.get_network_by_name("x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let mock = MockHcloudClient::new();
    let err = mock.delete_network(99).await.unwrap_err();
    assert!(err.is_not_found());
}
