//! Prints the Dummy CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run --bin crdgen > dummies.interview.com.yaml`

use crds::Dummy;
use kube::CustomResourceExt;

fn main() {
    let crd = Dummy::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD");
    println!("{}", yaml);
}
