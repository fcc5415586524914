//! # Node Runtime Tests
//!
//! Start a node per role, let it run briefly and shut it down.

use std::time::Duration;

use da_02_consensus::{Role, RolePhase};
use node_runtime::config::load_config_from;
use node_runtime::{NodeConfig, NodeRuntime};
use shared_crypto::Secp256k1KeyPair;
use shared_types::address_to_hex;
use tokio::time::{sleep, timeout};

fn config(vars: &[(&str, String)]) -> NodeConfig {
    load_config_from(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
    })
}

#[tokio::test]
async fn test_dev_sequencer_bootstraps_and_produces() {
    let key = Secp256k1KeyPair::generate();
    let runtime = NodeRuntime::new(config(&[
        ("DA_ROLE", "sequencer".to_string()),
        ("DA_BLOCK_TIME", "1".to_string()),
        ("DA_BOOTSTRAP_FUNDING", "true".to_string()),
        ("DA_VALIDATOR_KEY", format!("0x{}", hex::encode(key.to_bytes()))),
    ]))
    .unwrap();
    assert_eq!(runtime.consensus().address(), key.address());

    runtime.start().await.unwrap();

    // Funding, staking and at least one produced block.
    let chain = runtime.chain();
    timeout(Duration::from_secs(5), async {
        while chain.height() < 3 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("sequencer did not produce a block");
    assert!(!runtime.da().published().is_empty());

    runtime.shutdown().await;
    assert_eq!(*runtime.consensus().phase().borrow(), RolePhase::Stopped);
}

#[tokio::test]
async fn test_watchtower_loads_configured_key() {
    let reporter = Secp256k1KeyPair::generate();
    let runtime = NodeRuntime::new(config(&[
        ("DA_ROLE", "watchtower".to_string()),
        (
            "DA_WATCHTOWER_ADDRESS",
            address_to_hex(&reporter.address()),
        ),
        ("DA_WATCHTOWER_KEY", hex::encode(reporter.to_bytes())),
    ]))
    .unwrap();
    assert_eq!(runtime.consensus().role(), Role::WatchTower);

    runtime.start().await.unwrap();
    assert_eq!(*runtime.consensus().phase().borrow(), RolePhase::Watching);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_invalid_role_fails_construction() {
    let result = NodeRuntime::new(config(&[("DA_ROLE", "miner".to_string())]));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_malformed_validator_key_fails_construction() {
    let result = NodeRuntime::new(config(&[("DA_VALIDATOR_KEY", "0xnothex".to_string())]));
    assert!(result.is_err());
}
