pub mod collection;
pub mod error;
pub mod key;
pub mod schema;
#[allow(clippy::module_inception)]
pub mod store;

pub use collection::Collection;
pub use error::StoreError;
pub use key::StoreKey;
pub use schema::{CollectionDef, IndexDef, SchemaChange, UpgradePlan};
pub use store::{PersistentStore, StoreOptions};
