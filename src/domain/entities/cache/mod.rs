use crate::domain::value_objects::EntityKind;
use crate::domain::value_objects::offline::CheckInPayload;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key path of the owning wedding on every cached record.
pub const PARENT_KEY_PATH: &str = "weddingId";

/// A family of cached remote entities. Records are always written whole.
pub trait CachedRecord:
    Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static
{
    const COLLECTION: &'static str;
    const ENTITY: EntityKind;

    fn id(&self) -> &str;
    fn parent_id(&self) -> &str;
    /// Lower-cased sort key used when listing a parent's records.
    fn display_key(&self) -> Vec<String>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedGuest {
    pub id: String,
    pub wedding_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_status: Option<String>,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedGuest {
    pub fn new(
        id: impl Into<String>,
        wedding_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            wedding_id: wedding_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            rsvp_status: None,
            checked_in: false,
            checked_in_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn apply_check_in(&mut self, check_in: &CheckInPayload) {
        self.checked_in = check_in.checked_in;
        self.checked_in_at = check_in.checked_in.then_some(check_in.checked_in_at);
    }
}

impl CachedRecord for CachedGuest {
    const COLLECTION: &'static str = "guests";
    const ENTITY: EntityKind = EntityKind::Guest;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> &str {
        &self.wedding_id
    }

    fn display_key(&self) -> Vec<String> {
        vec![self.last_name.to_lowercase(), self.first_name.to_lowercase()]
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBudgetItem {
    pub id: String,
    pub wedding_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_amount: Option<f64>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedBudgetItem {
    pub fn new(
        id: impl Into<String>,
        wedding_id: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            wedding_id: wedding_id.into(),
            category: category.into(),
            description: description.into(),
            estimated_amount: None,
            actual_amount: None,
            paid: false,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl CachedRecord for CachedBudgetItem {
    const COLLECTION: &'static str = "budgets";
    const ENTITY: EntityKind = EntityKind::BudgetItem;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> &str {
        &self.wedding_id
    }

    fn display_key(&self) -> Vec<String> {
        vec![self.category.to_lowercase(), self.description.to_lowercase()]
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVendor {
    pub id: String,
    pub wedding_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedVendor {
    pub fn new(
        id: impl Into<String>,
        wedding_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            wedding_id: wedding_id.into(),
            name: name.into(),
            category: None,
            phone: None,
            email: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl CachedRecord for CachedVendor {
    const COLLECTION: &'static str = "vendors";
    const ENTITY: EntityKind = EntityKind::Vendor;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> &str {
        &self.wedding_id
    }

    fn display_key(&self) -> Vec<String> {
        vec![self.name.to_lowercase()]
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}
