//! Worker network

use super::{parse_id, role_labels, Ensurer, ROLE_WORKERS_NETWORK};
use crate::error::ControllerError;
use hcloud_client::{CreateNetworkRequest, HcloudError, NetworkSubnet, NetworkSubnetType};
use tracing::{debug, info};

impl Ensurer<'_> {
    /// Ensure the network `name` spanning `workers_cidr` exists, with one
    /// cloud subnet in the network zone of `region`. Returns the network id.
    pub async fn ensure_network(&self, name: &str, region: &str, workers_cidr: &str) -> Result<i64, ControllerError> {
        if let Some(network) = self
            .ctx
            .call("network", name, self.client.get_network_by_name(name))
            .await?
        {
            debug!(network = %name, id = network.id, "network exists");
            return Ok(network.id);
        }

        let location = self
            .ctx
            .call("location", region, self.client.get_location(region))
            .await?
            .ok_or_else(|| {
                ControllerError::cloud("location", region)(HcloudError::NotFound(format!("location {} not found", region)))
            })?;

        let request = CreateNetworkRequest {
            name: name.to_string(),
            ip_range: workers_cidr.to_string(),
            subnets: vec![NetworkSubnet {
                subnet_type: NetworkSubnetType::Cloud,
                ip_range: workers_cidr.to_string(),
                network_zone: location.network_zone,
                gateway: None,
            }],
            labels: role_labels(ROLE_WORKERS_NETWORK),
        };
        let network = self
            .ctx
            .call("network", name, self.client.create_network(request))
            .await?;
        info!(network = %name, id = network.id, ip_range = %workers_cidr, "created network");
        Ok(network.id)
    }

    /// Delete the network with the recorded id, if it still exists.
    pub async fn ensure_network_deleted(&self, network_id: &str) -> Result<(), ControllerError> {
        if network_id.is_empty() {
            return Ok(());
        }
        let id = parse_id("network", network_id)?;

        if self
            .ctx
            .call("network", network_id, self.client.get_network(id))
            .await?
            .is_none()
        {
            debug!(id, "network already gone");
            return Ok(());
        }

        match self.ctx.run(async { Ok(self.client.delete_network(id).await) }).await? {
            Ok(()) => {
                info!(id, "deleted network");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ControllerError::cloud("network", network_id)(e)),
        }
    }
}
