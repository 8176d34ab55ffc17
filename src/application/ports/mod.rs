pub mod conflict_resolver;
pub mod connectivity;
pub mod operation_log_store;
pub mod remote_gateway;
pub mod sync_trigger;

pub use conflict_resolver::{ConflictResolution, ConflictResolver};
pub use connectivity::ConnectivitySignal;
pub use operation_log_store::OperationLogStore;
pub use remote_gateway::{ApplyMode, RemoteApplyError, RemoteGateway};
pub use sync_trigger::SyncTrigger;
