//! Fleet records supplied by the administration backend.

use realtime::{EntityMetadata, GeoPoint};
use serde::{Deserialize, Serialize};

/// A bus as listed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: String,

    /// Identifier used by the push feed.
    pub bus_number: String,

    /// Last position the backend stored for the bus.
    #[serde(default)]
    pub current_location: Option<GeoPoint>,

    #[serde(default)]
    pub terminal_id: Option<String>,

    #[serde(default, flatten)]
    pub metadata: EntityMetadata,
}

impl Bus {
    /// Key used for markers and history lookups.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        if self.bus_number.is_empty() { &self.id } else { &self.bus_number }
    }
}

/// A terminal with a fixed position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

/// Buses and terminals currently known to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetDirectory {
    pub buses: Vec<Bus>,
    pub terminals: Vec<Terminal>,
}

impl FleetDirectory {
    #[must_use]
    pub fn terminal(&self, id: &str) -> Option<&Terminal> {
        self.terminals.iter().find(|terminal| terminal.id == id)
    }

    /// Whether `entity_id` names a listed bus, by bus number or id.
    #[must_use]
    pub fn lists(&self, entity_id: &str) -> bool {
        self.buses.iter().any(|bus| bus.bus_number == entity_id || bus.id == entity_id)
    }
}
