//! Inference determinism (§8): running the knowledge-graph convergence
//! twice on the bundled license set yields byte-identical serialisations.

use liccompat::config::ResourcesConfig;
use liccompat::inference::InferenceEngine;
use liccompat::resources;

fn converge() -> liccompat::inference::CompatibilityGraph {
    let resources = ResourcesConfig::default();
    let licenses = resources::load_licenses(&resources).unwrap();
    let schema = resources::load_schemas(&resources).unwrap();
    let mut engine = InferenceEngine::new(&schema);
    engine.infer(&licenses).unwrap()
}

#[test]
fn converging_twice_is_byte_identical() {
    let first = serde_json::to_string_pretty(&converge()).unwrap();
    let second = serde_json::to_string_pretty(&converge()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_bundled_pair_converges_to_a_terminal_edge() {
    let graph = converge();
    assert!(!graph.is_empty());
    for (_, compat) in graph.iter() {
        assert_ne!(*compat, liccompat::Compatibility::PartialIncompatible);
    }
}
