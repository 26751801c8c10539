use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;

/// A typed entity record cached by the local store.
///
/// Field names follow the backend's JSON wire format, so records round-trip
/// through the store and the API without renaming. Records created offline
/// carry a temporary identifier until the first successful sync.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection this entity lives in.
    const COLLECTION: Collection;

    /// The record's identifier (server-assigned, or a temporary one for
    /// optimistic offline creates).
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub organization_id: Option<String>,
    pub building_ids: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Building {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub total_units: u32,
    pub construction_year: Option<u32>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    pub id: String,
    pub building_id: String,
    pub unit_number: String,
    pub floor: i32,
    pub surface_area: f64,
    pub ownership_share: f64,
    pub unit_type: String,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expense {
    pub id: String,
    pub building_id: String,
    pub description: String,
    pub amount: f64,
    pub expense_date: String,
    pub due_date: String,
    pub category: String,
    pub payment_status: String,
    pub paid_date: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub id: String,
    pub building_id: String,
    pub title: String,
    pub file_name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: Option<String>,
}

macro_rules! impl_entity {
    ($type:ty, $collection:expr) => {
        impl Entity for $type {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

impl_entity!(User, Collection::Users);
impl_entity!(Building, Collection::Buildings);
impl_entity!(Owner, Collection::Owners);
impl_entity!(Unit, Collection::Units);
impl_entity!(Expense, Collection::Expenses);
impl_entity!(Document, Collection::Documents);
impl_entity!(Notification, Collection::Notifications);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_deserializes_from_partial_payload() {
        // Optimistic offline records only carry the fields the caller
        // supplied plus the synthesized id and timestamp.
        let building: Building = serde_json::from_str(
            r#"{"id": "temp-1", "name": "Residence A", "created_at": "2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(building.id, "temp-1");
        assert_eq!(building.name, "Residence A");
        assert_eq!(building.total_units, 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let owner: Owner = serde_json::from_str(
            r#"{"id": "o-1", "email": "a@x.be", "pagination_cursor": "xyz"}"#,
        )
        .unwrap();
        assert_eq!(owner.id, "o-1");
    }
}
