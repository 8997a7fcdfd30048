//! Persistent storage for CRM records
//!
//! Stores for contacts, locations, appointments and archived calls, each a
//! trait with unique-key lookups plus an in-memory reference
//! implementation. A production deployment substitutes database-backed
//! implementations behind the same traits.

pub mod appointments;
pub mod call_records;
pub mod contacts;
pub mod locations;

pub use appointments::{
    Appointment, AppointmentStatus, AppointmentStore, InMemoryAppointmentStore,
};
pub use call_records::{CallRecord, CallRecordStore, InMemoryCallRecordStore};
pub use contacts::{normalize_phone, Contact, ContactStatus, ContactStore, InMemoryContactStore};
pub use locations::{InMemoryLocationStore, Location, LocationStore};

use std::sync::Arc;
use thiserror::Error;

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("storage I/O error: {0}")]
    Io(String),
}

/// Bundle of all stores, built once at startup.
#[derive(Clone)]
pub struct PersistenceLayer {
    pub contacts: Arc<dyn ContactStore>,
    pub locations: Arc<dyn LocationStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub call_records: Arc<dyn CallRecordStore>,
}

impl PersistenceLayer {
    /// All-in-memory layer for single-process deployments and tests.
    pub fn in_memory() -> Self {
        Self {
            contacts: Arc::new(InMemoryContactStore::new()),
            locations: Arc::new(InMemoryLocationStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            call_records: Arc::new(InMemoryCallRecordStore::new()),
        }
    }
}
