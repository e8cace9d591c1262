//! Worker placement groups

use super::{parse_id, role_labels, Ensurer, POOL_LABEL, ROLE_WORKER_PLACEMENT_GROUP};
use crate::error::ControllerError;
use hcloud_client::{CreatePlacementGroupRequest, PlacementGroupType};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Name of the placement group of `pool`, also its key in the Worker status
pub fn placement_group_name(namespace: &str, pool: &str) -> String {
    format!("{}-{}", namespace, pool)
}

impl Ensurer<'_> {
    /// Ensure the placement group of `pool` exists. Returns its id.
    pub async fn ensure_placement_group(
        &self,
        namespace: &str,
        pool: &str,
        group_type: &str,
    ) -> Result<i64, ControllerError> {
        let name = placement_group_name(namespace, pool);

        if let Some(group) = self
            .ctx
            .call("placement group", &name, self.client.get_placement_group_by_name(&name))
            .await?
        {
            debug!(placement_group = %name, id = group.id, "placement group exists");
            return Ok(group.id);
        }

        let group_type = PlacementGroupType::from_name(group_type).ok_or_else(|| {
            ControllerError::InvalidConfig(format!("unsupported placement group type {:?}", group_type))
        })?;
        let mut labels = role_labels(ROLE_WORKER_PLACEMENT_GROUP);
        labels.insert(POOL_LABEL.to_string(), pool.to_string());

        let request = CreatePlacementGroupRequest {
            name: name.clone(),
            group_type,
            labels,
        };
        let group = self
            .ctx
            .call("placement group", &name, self.client.create_placement_group(request))
            .await?;
        info!(placement_group = %name, id = group.id, "created placement group");
        Ok(group.id)
    }

    /// Delete the placement group with the recorded id, if it still exists.
    pub async fn ensure_placement_group_deleted(&self, group_id: &str) -> Result<(), ControllerError> {
        if group_id.is_empty() {
            return Ok(());
        }
        let id = parse_id("placement group", group_id)?;

        if self
            .ctx
            .call("placement group", group_id, self.client.get_placement_group(id))
            .await?
            .is_none()
        {
            debug!(id, "placement group already gone");
            return Ok(());
        }

        match self
            .ctx
            .run(async { Ok(self.client.delete_placement_group(id).await) })
            .await?
        {
            Ok(()) => {
                info!(id, "deleted placement group");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ControllerError::cloud("placement group", group_id)(e)),
        }
    }

    /// Converge the placement groups of a Worker.
    ///
    /// `requested` maps pool name to placement group type for the pools that
    /// ask for a group. Recorded groups (keyed by
    /// [`placement_group_name`]) whose pool no longer asks for one are
    /// deleted, as are all of them when `deleting` is set. Each group is
    /// handled independently; the first failure aborts the pass. Returns the
    /// new set of recorded ids.
    pub async fn reconcile_placement_groups(
        &self,
        namespace: &str,
        requested: &BTreeMap<String, String>,
        recorded: &BTreeMap<String, String>,
        deleting: bool,
    ) -> Result<BTreeMap<String, String>, ControllerError> {
        let wanted: BTreeSet<String> = if deleting {
            BTreeSet::new()
        } else {
            requested.keys().map(|pool| placement_group_name(namespace, pool)).collect()
        };

        let mut ids = recorded.clone();
        for (key, id) in recorded {
            if !wanted.contains(key) {
                self.ensure_placement_group_deleted(id).await?;
                ids.remove(key);
            }
        }

        if !deleting {
            for (pool, group_type) in requested {
                let id = self.ensure_placement_group(namespace, pool, group_type).await?;
                ids.insert(placement_group_name(namespace, pool), id.to_string());
            }
        }

        Ok(ids)
    }
}
