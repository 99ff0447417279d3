//! Registry fetch and join.
//!
//! Reads the device, entity and area registries and flattens them into one
//! [`ActionableRecord`] per entity in an allowed domain.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::ConnectionError;
use crate::error::Result;
use crate::ha::Command;
use crate::ha::Session;
use crate::ha::Transport;

/// Label used when neither the entity nor its device has a known area
pub const NO_AREA: &str = "No Area";

/// A device as listed by `config/device_registry/list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    #[serde(default)]
    pub area_id: Option<String>,
}

/// An entity as listed by `config/entity_registry/list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityEntry {
    pub entity_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}

impl EntityEntry {
    /// The part of `entity_id` before the first `.`
    pub fn domain(&self) -> &str {
        self.entity_id
            .split('.')
            .next()
            .unwrap_or(&self.entity_id)
    }

    /// User name, then integration name, then the entity id itself
    pub fn display_name(&self) -> &str {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.original_name))
            .unwrap_or(&self.entity_id)
    }
}

/// An area as listed by `config/area_registry/list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AreaEntry {
    pub area_id: String,
    pub name: String,
}

/// One entity joined with its device and area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionableRecord {
    pub display_name: String,
    pub location_name: String,
    /// None for entities that do not belong to a device
    pub device_id: Option<String>,
    pub entity_id: String,
    pub domain: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Join the three registries.
///
/// Entities keep the order the remote listed them in, so identical
/// registries always produce identical output.
pub fn join(
    devices: &[DeviceEntry],
    entities: &[EntityEntry],
    areas: &[AreaEntry],
    domains: &[String],
) -> Vec<ActionableRecord> {
    let devices: HashMap<&str, &DeviceEntry> =
        devices.iter().map(|d| (d.id.as_str(), d)).collect();
    let areas: HashMap<&str, &str> = areas
        .iter()
        .map(|a| (a.area_id.as_str(), a.name.as_str()))
        .collect();

    let resolve = |area_id: Option<&str>, entity_id: &str| -> Option<String> {
        let area_id = area_id.filter(|id| !id.is_empty())?;
        match areas.get(area_id) {
            Some(name) => Some((*name).to_string()),
            None => {
                warn!("{}: area '{}' is not in the area registry", entity_id, area_id);
                None
            }
        }
    };

    entities
        .iter()
        .filter(|entity| domains.iter().any(|d| d == entity.domain()))
        .map(|entity| {
            let device = entity
                .device_id
                .as_deref()
                .and_then(|id| devices.get(id).copied());

            let location_name = resolve(entity.area_id.as_deref(), &entity.entity_id)
                .or_else(|| {
                    device.and_then(|d| resolve(d.area_id.as_deref(), &entity.entity_id))
                })
                .unwrap_or_else(|| NO_AREA.to_string());

            ActionableRecord {
                display_name: entity.display_name().to_string(),
                location_name,
                device_id: entity.device_id.clone().filter(|id| !id.is_empty()),
                entity_id: entity.entity_id.clone(),
                domain: entity.domain().to_string(),
            }
        })
        .collect()
}

/// Read all three registries over `session` and join them.
pub async fn fetch<T: Transport>(
    session: &mut Session<T>,
    domains: &[String],
) -> Result<Vec<ActionableRecord>> {
    let devices: Vec<DeviceEntry> = list(session, Command::DeviceRegistryList).await?;
    let entities: Vec<EntityEntry> = list(session, Command::EntityRegistryList).await?;
    let areas: Vec<AreaEntry> = list(session, Command::AreaRegistryList).await?;
    info!(
        "Fetched {} devices, {} entities, {} areas",
        devices.len(),
        entities.len(),
        areas.len()
    );

    let records = join(&devices, &entities, &areas, domains);
    debug!("{} entities in domains {:?}", records.len(), domains);
    Ok(records)
}

async fn list<T, R>(session: &mut Session<T>, command: Command) -> Result<Vec<R>>
where
    T: Transport,
    R: serde::de::DeserializeOwned,
{
    let envelope = session.request(&command).await?;
    if !envelope.success {
        return Err(ConnectionError::UnexpectedMessage(format!(
            "{:?} failed: {}",
            command,
            envelope.error_message().unwrap_or("no error detail")
        ))
        .into());
    }
    Ok(envelope.into_list()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ha::transport::MockTransport;
    use crate::ha::transport::failure;
    use crate::ha::transport::request_id;
    use crate::ha::transport::success;

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    fn entity(entity_id: &str, device_id: Option<&str>) -> EntityEntry {
        EntityEntry {
            entity_id: entity_id.to_string(),
            device_id: device_id.map(String::from),
            area_id: None,
            name: None,
            original_name: None,
        }
    }

    fn device(id: &str, area_id: Option<&str>) -> DeviceEntry {
        DeviceEntry {
            id: id.to_string(),
            area_id: area_id.map(String::from),
        }
    }

    fn area(area_id: &str, name: &str) -> AreaEntry {
        AreaEntry {
            area_id: area_id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_domain() {
        assert_eq!(entity("light.kitchen", None).domain(), "light");
        assert_eq!(entity("device_tracker.phone.2", None).domain(), "device_tracker");
        assert_eq!(entity("nodot", None).domain(), "nodot");
    }

    #[test]
    fn test_display_name_priority() {
        let mut e = entity("light.kitchen", None);
        assert_eq!(e.display_name(), "light.kitchen");

        e.original_name = Some("Ceiling".to_string());
        assert_eq!(e.display_name(), "Ceiling");

        e.name = Some(String::new());
        assert_eq!(e.display_name(), "Ceiling");

        e.name = Some("Kitchen Light".to_string());
        assert_eq!(e.display_name(), "Kitchen Light");
    }

    #[test]
    fn test_entity_area_wins() {
        let mut e = entity("light.lamp", Some("dev1"));
        e.area_id = Some("office".to_string());

        let records = join(
            &[device("dev1", Some("bedroom"))],
            &[e],
            &[area("bedroom", "Bedroom"), area("office", "Office")],
            &domains(&["light"]),
        );
        assert_eq!(records[0].location_name, "Office");
    }

    #[test]
    fn test_device_area_fallback() {
        let records = join(
            &[device("dev1", Some("bedroom"))],
            &[entity("light.lamp", Some("dev1"))],
            &[area("bedroom", "Bedroom")],
            &domains(&["light"]),
        );
        assert_eq!(records[0].location_name, "Bedroom");
    }

    #[test]
    fn test_unresolvable_entity_area_falls_through_to_device() {
        let mut e = entity("light.lamp", Some("dev1"));
        e.area_id = Some("deleted_area".to_string());

        let records = join(
            &[device("dev1", Some("bedroom"))],
            &[e],
            &[area("bedroom", "Bedroom")],
            &domains(&["light"]),
        );
        assert_eq!(records[0].location_name, "Bedroom");
    }

    #[test]
    fn test_no_area_label() {
        let records = join(
            &[device("dev1", None), device("dev2", Some("gone"))],
            &[
                entity("light.a", Some("dev1")),
                entity("light.b", Some("dev2")),
                entity("light.c", Some("unknown_device")),
                entity("light.d", None),
            ],
            &[],
            &domains(&["light"]),
        );
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.location_name == NO_AREA));
    }

    #[test]
    fn test_domain_filtering_keeps_order() {
        let records = join(
            &[],
            &[
                entity("switch.fan", None),
                entity("sensor.temperature", None),
                entity("light.lamp", Some("dev1")),
                entity("automation.morning", None),
            ],
            &[],
            &domains(&["light", "switch"]),
        );
        let ids: Vec<&str> = records.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["switch.fan", "light.lamp"]);
        assert_eq!(records[0].domain, "switch");
        assert_eq!(records[0].device_id, None);
        assert_eq!(records[1].device_id.as_deref(), Some("dev1"));
    }

    #[test]
    fn test_deserialize_registry_entries() {
        let entities: Vec<EntityEntry> = serde_json::from_value(serde_json::json!([
            {
                "entity_id": "light.lamp",
                "device_id": null,
                "area_id": null,
                "name": null,
                "original_name": "Lamp",
                "platform": "hue",
                "labels": []
            }
        ]))
        .unwrap();
        assert_eq!(entities[0].device_id, None);
        assert_eq!(entities[0].display_name(), "Lamp");

        let devices: Vec<DeviceEntry> =
            serde_json::from_value(serde_json::json!([{"id": "d1", "manufacturer": "Signify"}]))
                .unwrap();
        assert_eq!(devices[0].area_id, None);
    }

    fn registry_transport() -> MockTransport {
        MockTransport::new().respond_with(|msg| {
            let id = request_id(msg);
            let result = match msg["type"].as_str() {
                Some("config/device_registry/list") => serde_json::json!([
                    {"id": "dev1", "area_id": "bedroom"},
                ]),
                Some("config/entity_registry/list") => serde_json::json!([
                    {
                        "entity_id": "light.bedroom_lamp",
                        "device_id": "dev1",
                        "name": "Bedroom Lamp",
                    },
                    {"entity_id": "sensor.temp", "device_id": "dev1"},
                    {"entity_id": "switch.garden", "original_name": "Garden"},
                ]),
                Some("config/area_registry/list") => serde_json::json!([
                    {"area_id": "bedroom", "name": "Bedroom"},
                ]),
                _ => return vec![failure(id, "unknown command")],
            };
            vec![success(id, result)]
        })
    }

    #[tokio::test]
    async fn test_fetch_issues_three_requests_in_order() {
        let mut session = Session::handshake(registry_transport(), "secret", None)
            .await
            .unwrap();

        let records = fetch(&mut session, &domains(&["light", "switch"]))
            .await
            .unwrap();

        assert_eq!(
            session.transport().sent_types(),
            vec![
                "auth",
                "config/device_registry/list",
                "config/entity_registry/list",
                "config/area_registry/list",
            ]
        );
        let ids: Vec<u64> = session.transport().sent[1..]
            .iter()
            .map(request_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(
            records,
            vec![
                ActionableRecord {
                    display_name: "Bedroom Lamp".to_string(),
                    location_name: "Bedroom".to_string(),
                    device_id: Some("dev1".to_string()),
                    entity_id: "light.bedroom_lamp".to_string(),
                    domain: "light".to_string(),
                },
                ActionableRecord {
                    display_name: "Garden".to_string(),
                    location_name: NO_AREA.to_string(),
                    device_id: None,
                    entity_id: "switch.garden".to_string(),
                    domain: "switch".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_failed_query_is_connection_error() {
        let transport = MockTransport::new().respond_with(|msg| {
            vec![failure(request_id(msg), "Unauthorized")]
        });
        let mut session = Session::handshake(transport, "secret", None).await.unwrap();

        let err = fetch(&mut session, &domains(&["light"])).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionError::UnexpectedMessage(_))
        ));
    }
}
