use std::collections::BTreeMap;
use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use super::{ClusterConfig, ConfigError};

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn parses_a_well_formed_config() {
    let file = write_config(
        r#"{
            "block_port": 8081,
            "num_metadata_servers": 3,
            "num_leaders": 1,
            "metadata_ports": {"1": 8082, "2": 8083, "3": 8084}
        }"#,
    );
    let config = ClusterConfig::from_file(file.path()).unwrap();
    assert_eq!(config.block_port, 8081);
    assert_eq!(config.num_metadata_servers, 3);
    assert!(config.is_leader(1));
    assert!(!config.is_leader(2));
    assert_eq!(config.metadata_port(2).unwrap(), 8083);
}

#[test]
fn rejects_leader_outside_replica_range() {
    let file = write_config(
        r#"{
            "block_port": 8081,
            "num_metadata_servers": 2,
            "num_leaders": 5,
            "metadata_ports": {"1": 8082, "2": 8083}
        }"#,
    );
    let err = ClusterConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::LeaderOutOfRange { .. }));
}

#[test]
fn rejects_missing_metadata_port_entry() {
    let file = write_config(
        r#"{
            "block_port": 8081,
            "num_metadata_servers": 3,
            "num_leaders": 1,
            "metadata_ports": {"1": 8082, "2": 8083}
        }"#,
    );
    let err = ClusterConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingMetadataPort { replica_id: 3 }));
}

#[test]
fn metadata_port_rejects_out_of_range_replica() {
    let mut metadata_ports = BTreeMap::new();
    metadata_ports.insert(1, 8082);
    let config = ClusterConfig {
        block_port: 8081,
        num_metadata_servers: 1,
        num_leaders: 1,
        metadata_ports,
    };
    let err = config.metadata_port(2).unwrap_err();
    assert!(matches!(err, ConfigError::ReplicaOutOfRange { replica_id: 2, .. }));
}
