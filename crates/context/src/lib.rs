//! `rowgate-context` — task-scoped request context carrier.
//!
//! The tenant and user identity of a request travel with the task that
//! serves it, not with the OS thread. A context is only ever installed for
//! the extent of a future (or closure) and is dropped when that future
//! completes, fails, panics or is cancelled.

pub mod carrier;
pub mod request;
pub mod selection;

pub use carrier::ContextCarrier;
pub use request::RequestContext;
pub use selection::{DataSourceSelection, PoolHandle, SelectionTicket};
