pub mod action_id;
pub mod action_kind;
pub mod action_status;
pub mod http_method;
pub mod remote_target;

pub use action_id::ActionId;
pub use action_kind::{
    ActionKind, ActionPayload, CheckInPayload, CreateEntityPayload, DeleteEntityPayload,
    EditEntityPayload, EntityKind,
};
pub use action_status::ActionStatus;
pub use http_method::HttpMethod;
pub use remote_target::RemoteTarget;
