//! Single-slot admission gate for backend submissions.
//!
//! The backend has one global pending-captcha slot, so only one
//! submission may be outstanding at a time across all runs. Further runs
//! queue on the gate in arrival order.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use reso_domain::error::{Error, Result};

#[derive(Clone)]
pub struct AdmissionGate {
    slot: Arc<Semaphore>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot without waiting, if it is free.
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        self.slot.clone().try_acquire_owned().ok()
    }

    /// Wait for the slot. The permit releases it on drop.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        self.slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("admission gate closed".into()))
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}
