mod config;
mod error;
mod error_channel;
mod events;
mod reference;
mod session;
mod snapshot;
mod store;
mod subscription;
pub mod test_infrastructure;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{FailureKind, Result, SyncError, WatchError};
pub use error_channel::{ErrorChannel, FailureHandler, ListenerToken};
pub use events::{AttemptedOperation, EventKind, FailureEvent};
pub use reference::{Direction, DocumentRef, Filter, FilterOp, OrderBy, QueryRef, Reference};
pub use session::AuthSession;
pub use snapshot::{DocumentSnapshot, QuerySnapshot, Record};
pub use store::{
	DocumentCallback, ErrorCallback, QueryCallback, Store, StoreError, StoreErrorCode,
	SubscriptionId,
};
pub use subscription::SubscriptionGuard;
pub use watcher::{CollectionWatcher, DocumentWatcher, Phase, Watcher, WatcherState};
