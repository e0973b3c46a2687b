//! Client side of the shenbury storefront.
//!
//! - [`worker`]: generation-scoped resource cache that intercepts page fetches
//! - [`sale`]: presale data behind a read-through cache with default fallbacks
//! - [`fetch`]: request/response types and the HTTP network boundary

pub mod fetch;
pub mod sale;
pub mod worker;

pub use fetch::{FetchConfig, HttpNetwork, Network, ResourceRequest, ResourceResponse};
pub use sale::{SaleConfig, SaleDataService, SaleSnapshot, TokenProjection, project};
pub use worker::{ActivationReport, CachePolicy, InstallReport, Lifecycle, ResourceCacheController, WorkerConfig};
