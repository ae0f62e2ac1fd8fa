pub mod connectivity;
pub mod entity_cache;
pub mod mutation_queue;
pub mod remote_transport;
pub mod sync_metadata;
pub mod sync_observer;

pub use connectivity::Connectivity;
pub use entity_cache::EntityCache;
pub use mutation_queue::MutationQueue;
pub use remote_transport::{RemoteRequest, RemoteResponse, RemoteTransport};
pub use sync_metadata::SyncMetadataStore;
pub use sync_observer::SyncObserver;
