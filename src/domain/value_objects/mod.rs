pub mod offline;

pub use offline::{
    ActionId, ActionKind, ActionPayload, ActionStatus, EntityKind, HttpMethod, RemoteTarget,
};
