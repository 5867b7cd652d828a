use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A field worker. Workload and availability are always derived from the
/// request list, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collector {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Collector {
    pub fn display_name(&self) -> String {
        match &self.lastname {
            Some(lastname) if !lastname.trim().is_empty() => format!("{} {}", self.name, lastname),
            _ => self.name.clone(),
        }
    }
}
