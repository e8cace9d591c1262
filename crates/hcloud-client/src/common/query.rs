//! Query helpers for hcloud list endpoints

use crate::common::{HttpClient, Paginated};
use crate::error::HcloudError;
use crate::models::*;
use serde::Deserialize;

/// List a resource collection with optional filters, following pagination.
pub async fn query_resources<T, L>(
    http: &HttpClient,
    endpoint: &str,
    filters: &[(&str, &str)],
) -> Result<Vec<T>, HcloudError>
where
    L: Paginated<T> + for<'de> Deserialize<'de>,
{
    let mut path = format!("/{}", endpoint);
    if !filters.is_empty() {
        path = format!("{}?{}", path, http.build_query_string(filters));
    }
    http.fetch_all_pages::<T, L>(&path).await
}

/// Return the single resource matched by `filters`, if any.
pub async fn query_first<T, L>(
    http: &HttpClient,
    endpoint: &str,
    filters: &[(&str, &str)],
) -> Result<Option<T>, HcloudError>
where
    L: Paginated<T> + for<'de> Deserialize<'de>,
{
    Ok(query_resources::<T, L>(http, endpoint, filters)
        .await?
        .into_iter()
        .next())
}

macro_rules! paginated {
    ($list:ty, $item:ty, $field:ident) => {
        impl Paginated<$item> for $list {
            fn into_parts(self) -> (Vec<$item>, Meta) {
                (self.$field, self.meta)
            }
        }
    };
}

paginated!(NetworkList, Network, networks);
paginated!(SshKeyList, SshKey, ssh_keys);
paginated!(PlacementGroupList, PlacementGroup, placement_groups);
paginated!(ImageList, Image, images);
paginated!(LocationList, Location, locations);
paginated!(DatacenterList, Datacenter, datacenters);
paginated!(ServerTypeList, ServerType, server_types);
