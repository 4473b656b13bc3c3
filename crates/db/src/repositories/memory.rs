use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use slotly_core::domain::agent::{Agent, AgentId};
use slotly_core::domain::appointment::{Appointment, AppointmentId, AppointmentStatus};
use slotly_core::domain::lead::{Lead, LeadId, LeadStatus};
use slotly_core::domain::offer::SlotOffer;

use super::{
    AgentRepository, AppointmentRepository, LeadRepository, RepositoryError, SlotOfferRepository,
};

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<String, Agent>>,
}

#[async_trait::async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let agents = self.agents.read().await;
        Ok(agents.get(&id.0).cloned())
    }

    async fn save(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut agents = self.agents.write().await;
        agents.insert(agent.id.0.clone(), agent);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<String, Lead>>,
}

#[async_trait::async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.get(&id.0).cloned())
    }

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id.0.clone(), lead);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        if let Some(lead) = leads.get_mut(&id.0) {
            lead.status = status;
            lead.updated_at = updated_at;
        }
        Ok(())
    }
}

/// In-memory double that mirrors the store's partial unique index on
/// (agent, start) over non-cancelled rows, so orchestrator tests exercise
/// the lost-race conflict path.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<String, Appointment>>,
}

fn slot_taken(existing: &HashMap<String, Appointment>, candidate: &Appointment) -> bool {
    existing.values().any(|a| {
        a.id != candidate.id
            && a.agent_id == candidate.agent_id
            && a.start_at == candidate.start_at
            && a.status != AppointmentStatus::Cancelled
    })
}

#[async_trait::async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_id(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id.0).cloned())
    }

    async fn insert(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        let mut appointments = self.appointments.write().await;
        if appointment.status != AppointmentStatus::Cancelled
            && slot_taken(&appointments, &appointment)
        {
            return Err(RepositoryError::Conflict(format!(
                "appointment slot taken: {} at {}",
                appointment.agent_id.0, appointment.start_at
            )));
        }
        appointments.insert(appointment.id.0.clone(), appointment);
        Ok(())
    }

    async fn update(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        self.insert(appointment).await
    }
}

#[derive(Default)]
pub struct InMemorySlotOfferRepository {
    offers: RwLock<HashMap<String, SlotOffer>>,
}

#[async_trait::async_trait]
impl SlotOfferRepository for InMemorySlotOfferRepository {
    async fn find_for_lead(&self, lead_id: &LeadId) -> Result<Option<SlotOffer>, RepositoryError> {
        let offers = self.offers.read().await;
        Ok(offers.get(&lead_id.0).cloned())
    }

    async fn put(&self, offer: SlotOffer) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        offers.insert(offer.lead_id.0.clone(), offer);
        Ok(())
    }

    async fn clear_for_lead(&self, lead_id: &LeadId) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        offers.remove(&lead_id.0);
        Ok(())
    }
}
