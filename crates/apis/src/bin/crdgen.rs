//! Print the custom resource definitions the extension serves as YAML.
//!
//! ```sh
//! cargo run -p hcloud-apis --bin crdgen > crds.yaml
//! ```

use hcloud_apis::{Cluster, Infrastructure, Worker};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [Infrastructure::crd(), Worker::crd(), Cluster::crd()];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
