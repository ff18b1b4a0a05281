mod container;
mod error;
mod pool;
mod scratch;
mod stats;

pub use container::{Counter, CounterMap, SharedMap};
pub use error::{HarnessError, Violation};
pub use pool::{BatchOutcome, UnitContext, WorkerPool};
pub use scratch::{ScratchStore, UnitId};
pub use stats::{PoolStats, PoolStatsSnapshot, SharedStats};
