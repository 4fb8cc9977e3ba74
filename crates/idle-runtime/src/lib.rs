#![deny(warnings)]

//! Runtime for Hash Tycoon: the seeded network simulator, the shared network
//! handle and the command service that ties the economy to a repository.

pub mod network;
pub mod service;
pub mod shared;

pub use network::{retarget, NetworkSimulator};
pub use service::{CommandOutcome, GameService, ServiceError, DEFAULT_MAX_ATTEMPTS};
pub use shared::SharedNetwork;
