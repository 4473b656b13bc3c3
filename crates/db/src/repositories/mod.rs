use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use slotly_core::domain::agent::{Agent, AgentId};
use slotly_core::domain::appointment::{Appointment, AppointmentId};
use slotly_core::domain::lead::{Lead, LeadId, LeadStatus};
use slotly_core::domain::offer::SlotOffer;

pub mod agent;
pub mod appointment;
pub mod lead;
pub mod memory;
pub mod offer;

pub use agent::SqlAgentRepository;
pub use appointment::SqlAppointmentRepository;
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryAgentRepository, InMemoryAppointmentRepository, InMemoryLeadRepository,
    InMemorySlotOfferRepository,
};
pub use offer::SqlSlotOfferRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// A uniqueness constraint rejected the write. For appointments this is
    /// the (agent, slot) backstop firing on a lost booking race.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub(crate) fn from_write(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = error {
            if db.message().contains("UNIQUE constraint failed") {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Database(error)
    }
}

/// Agent directory. Owned elsewhere; the core only reads, `save` exists for
/// seeding and tests.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;
    async fn save(&self, agent: Agent) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    async fn save(&self, lead: Lead) -> Result<(), RepositoryError>;
    async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &AppointmentId)
        -> Result<Option<Appointment>, RepositoryError>;
    async fn insert(&self, appointment: Appointment) -> Result<(), RepositoryError>;
    async fn update(&self, appointment: Appointment) -> Result<(), RepositoryError>;
}

/// At most one pending offer per lead; `put` replaces any existing offer.
#[async_trait]
pub trait SlotOfferRepository: Send + Sync {
    async fn find_for_lead(&self, lead_id: &LeadId) -> Result<Option<SlotOffer>, RepositoryError>;
    async fn put(&self, offer: SlotOffer) -> Result<(), RepositoryError>;
    async fn clear_for_lead(&self, lead_id: &LeadId) -> Result<(), RepositoryError>;
}
