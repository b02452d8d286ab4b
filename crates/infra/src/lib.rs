//! Infrastructure layer: record stores, the request mediator, bulk actions,
//! user import and configuration.

pub mod bulk;
pub mod config;
pub mod error;
pub mod identity;
pub mod import;
pub mod mediator;
pub mod read_model;


pub use bulk::{BulkAction, BulkFailure, BulkReport};
pub use config::{ConfigError, Settings};
pub use error::{ServiceError, ServiceResult};
pub use identity::{IdentityStore, SharedStore, WorkAreaRegistry};
pub use import::{ImportReport, ImportRow, RowFailure};
pub use mediator::{Mediator, RequestContext, Stores};
