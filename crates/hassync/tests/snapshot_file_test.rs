use std::collections::HashMap;

use hassync::ActionableRecord;
use hassync::snapshot;
use hassync::snapshot::SnapshotWarning;
use tempfile::TempDir;

fn record(
    name: &str,
    location: &str,
    device_id: Option<&str>,
    entity_id: &str,
) -> ActionableRecord {
    ActionableRecord {
        display_name: name.to_string(),
        location_name: location.to_string(),
        device_id: device_id.map(String::from),
        entity_id: entity_id.to_string(),
        domain: entity_id.split('.').next().unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_write_then_read() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("localData").join("ha_entities_output.yaml");

    let records = vec![
        record("Bedroom Lamp", "Bedroom", Some("dev1"), "light.bedroom_lamp"),
        record("Bedroom Lamp Night", "Bedroom", Some("dev1"), "switch.bedroom_night"),
        record("Vacuum", "No Area", Some("dev2"), "vacuum.downstairs"),
        record("Front Door", "No Area", None, "tag.front_door"),
    ];
    snapshot::write_file(&path, &records).await.unwrap();

    let parsed = snapshot::read_file(&path).await.unwrap();
    let mapping: HashMap<&str, &str> = parsed.mapping.iter().collect();
    assert_eq!(
        mapping,
        HashMap::from([("dev1", "Bedroom Lamp Night"), ("dev2", "Vacuum")])
    );
    assert!(matches!(
        parsed.warnings.as_slice(),
        [SnapshotWarning::Superseded { line: 7, .. }]
    ));
}

#[tokio::test]
async fn test_hand_edited_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot.yaml");

    let records = vec![
        record("Kitchen Light", "Kitchen", Some("dev1"), "light.kitchen"),
        record("Hall Light", "Hall", Some("dev2"), "light.hall"),
    ];
    snapshot::write_file(&path, &records).await.unwrap();

    let edited = std::fs::read_to_string(&path)
        .unwrap()
        .replace("NAME: Kitchen Light", "NAME: Kitchen Ceiling");
    std::fs::write(&path, format!("Exported registry\n\n{}", edited)).unwrap();

    let parsed = snapshot::read_file(&path).await.unwrap();
    let pairs: Vec<_> = parsed.mapping.iter().collect();
    assert_eq!(pairs, vec![("dev1", "Kitchen Ceiling"), ("dev2", "Hall Light")]);
}

#[tokio::test]
async fn test_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let parsed = snapshot::read_file(&temp_dir.path().join("nope.yaml"))
        .await
        .unwrap();
    assert!(parsed.mapping.is_empty());
    assert!(parsed.warnings.is_empty());
}

#[tokio::test]
async fn test_unreadable_path_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = snapshot::read_file(temp_dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), hassync::ErrorKind::Io);
}
