//! Data access for the pulse dashboard.
//!
//! A [`RemoteDataSource`](remote::RemoteDataSource) talks to the analytics
//! API, a [`SyntheticDataSource`](synthetic::SyntheticDataSource) serves the
//! built-in reference dataset, and the
//! [`ResilientDataService`](service::ResilientDataService) combines them so
//! callers always get data. The [`RefreshScheduler`](scheduler::RefreshScheduler)
//! keeps a per-collection cache fresh in the background.

pub mod error;
pub mod remote;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod synthetic;

pub use error::{FetchError, ServiceError};
pub use service::{ModeSwitch, ResilientDataService};
pub use source::{CollectionData, DataOrigin, DataSource, Sourced};
