//! Prints the `ChuckNorris` CustomResourceDefinition as YAML.
//!
//! ```sh
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use chucknorris_controller::ChuckNorris;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&ChuckNorris::crd())?);
    Ok(())
}
