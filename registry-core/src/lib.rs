#![forbid(unsafe_code)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! In-memory service registry core: leases, renewal, cancellation, status
//! overrides, self-preservation eviction, change-log deltas, and
//! cross-region union reads.
//!
//! The engine itself is [`registry::RegistryCore`]; [`eviction`] and
//! [`pruner`] are the two background tasks an embedder spawns alongside it.
//! Everything else is a supporting component the core composes.

pub mod activity;
pub mod arbiter;
pub mod asg;
pub mod cache;
pub mod change_log;
pub mod clock;
pub mod error;
pub mod eviction;
pub mod lease;
pub mod overrides;
pub mod pruner;
pub mod reads;
pub mod registry;
pub mod remote;
pub mod renewals;

pub use asg::AsgOracle;
pub use cache::ResponseCacheInvalidator;
pub use clock::{Clock, RealClock};
pub use error::{Error, ErrorType, Result};
pub use eviction::EvictionSweeper;
pub use lease::Lease;
pub use pruner::ChangeLogPruner;
pub use registry::RegistryCore;
pub use remote::{RemoteRegistries, RemoteRegistry};

pub use registry_types::{
    ActionType, Application, Applications, InstanceInfo, InstanceStatus, LeaseInfo, RegistryConfig,
};
