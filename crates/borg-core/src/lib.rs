//! Collection engine of the borg exporter.
//!
//! - [`Collector`] runs one cycle over every configured repository and writes [`BorgMetrics`].
//! - [`Scheduler`] decides when the next cycle is due using wall-clock time only.
//! - [`SharedCache`] serializes writers and tracks the in-flight cycle.
//!
//! [`BorgMetrics`]: borg_prometheus::BorgMetrics

mod cache;
pub use cache::{CacheState, CollectionGuard, SharedCache};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

mod collector;
pub use collector::{Collector, CollectorConfig};

mod error;
pub use error::{CollectCause, ErrorCategory, RepositoryError};

mod projection;
pub use projection::project_info;

mod scheduler;
pub use scheduler::Scheduler;

mod system;
pub use system::{borg_version, hostname};
