//! Prints the FleetOps CRD manifests as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crds.yaml`

use crds::{MacLink, Machine};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let machine = serde_yaml::to_string(&Machine::crd())?;
    let mac_link = serde_yaml::to_string(&MacLink::crd())?;
    print!("{machine}---\n{mac_link}");
    Ok(())
}
