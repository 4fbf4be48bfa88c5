//! Owner sync core: keeps each HubSpot contact's owner aligned with the owner
//! of its most recently created deal.

pub mod config;
pub mod error;
pub mod hubspot;
pub mod models;
pub mod mutation;
pub mod o11y;
pub mod pagination;
pub mod reconcile;
pub mod scheduler;
pub mod traits;

mod test_support;

pub use config::{LogFormat, SyncConfig};
pub use error::{Error, Result};
pub use hubspot::HubSpotClient;
pub use models::{Contact, CrmObject, Deal, RunReport, UpdateDecision};
pub use reconcile::{OwnerSync, SyncJob, reconcile};
pub use scheduler::SyncScheduler;
pub use traits::{ApiRequest, CrmApi};
