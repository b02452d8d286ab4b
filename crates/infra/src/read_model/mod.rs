//! Record storage behind the mediator.

pub mod record_store;

pub use record_store::{
    InMemoryRecordStore, RecordStore, SoftDeleteQueries, StoreError, StoreResult, Transaction, transact,
};
