//! The booking transaction orchestrator.
//!
//! Create, reschedule, and cancel each run as a sequential compensating
//! sequence across the conferencing service, the calendar service, and the
//! record store. Only record-store persistence is fatal: conferencing and
//! calendar creation degrade to placeholders, and a fatal persistence
//! failure triggers best-effort deletion of whatever real resources were
//! created earlier in the sequence.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use slotly_connect::{
    retry_with_backoff, BackoffPolicy, CalendarEvent, CalendarEventRequest, CalendarService,
    ConferencingService, Meeting, MeetingRequest, Notifier, Retryable,
};
use slotly_core::domain::agent::{Agent, AgentId};
use slotly_core::domain::appointment::{Appointment, AppointmentId, AppointmentStatus};
use slotly_core::domain::lead::{Lead, LeadId, LeadStatus};
use slotly_core::domain::offer::SlotOffer;
use slotly_core::errors::{
    BookingError, CompensationAction, ExternalSystem, NotFoundError, TransactionFailedError,
    ValidationError,
};
use slotly_core::slots::SchedulingConfig;
use slotly_core::timewindow::{format_display, BusinessClock};
use slotly_db::repositories::{
    AgentRepository, AppointmentRepository, LeadRepository, RepositoryError, SlotOfferRepository,
};

/// Sentinel join URL stored when conferencing creation degraded. Formatting
/// code treats this as "link to follow", never as a real link.
pub const PLACEHOLDER_JOIN_URL: &str = "pending";

/// Outcome of one non-critical external creation step. An explicit tag
/// rather than a nullable pair so downstream code cannot mistake a
/// placeholder for a real resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome<T> {
    Provisioned(T),
    Placeholder,
    NotAttempted,
}

impl<T> ProvisionOutcome<T> {
    pub fn as_provisioned(&self) -> Option<&T> {
        match self {
            Self::Provisioned(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_provisioned(&self) -> bool {
        matches!(self, Self::Provisioned(_))
    }
}

#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub lead_id: LeadId,
    pub agent_id: AgentId,
    pub start: DateTime<Tz>,
    pub display_name: String,
    pub notes: String,
}

#[derive(Clone, Debug)]
pub struct BookingReceipt {
    pub appointment: Appointment,
    pub conferencing: ProvisionOutcome<Meeting>,
    pub calendar: ProvisionOutcome<CalendarEvent>,
}

/// External collaborators and repositories the orchestrator drives.
pub struct OrchestratorDeps {
    pub calendar: Arc<dyn CalendarService>,
    pub conferencing: Arc<dyn ConferencingService>,
    pub notifier: Arc<dyn Notifier>,
    pub agents: Arc<dyn AgentRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub offers: Arc<dyn SlotOfferRepository>,
}

pub struct BookingOrchestrator {
    deps: OrchestratorDeps,
    clock: BusinessClock,
    config: SchedulingConfig,
    backoff: BackoffPolicy,
}

/// Wrapper so persistence retries can classify store faults: transient
/// database errors retry, uniqueness conflicts and decode errors abort.
/// Carries the number of attempts actually made when the write gave up.
struct PersistFault {
    error: RepositoryError,
    attempts: u32,
}

impl std::fmt::Display for PersistFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl Retryable for PersistFault {
    fn is_retryable(&self) -> bool {
        matches!(self.error, RepositoryError::Database(_))
    }
}

impl BookingOrchestrator {
    pub fn new(
        deps: OrchestratorDeps,
        clock: BusinessClock,
        config: SchedulingConfig,
        backoff: BackoffPolicy,
    ) -> Self {
        Self { deps, clock, config, backoff }
    }

    // ---- create ----------------------------------------------------------

    pub async fn create(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError> {
        self.create_at(request, self.clock.now()).await
    }

    /// As `create`, with an explicit `now` for deterministic callers.
    pub async fn create_at(
        &self,
        request: BookingRequest,
        now: DateTime<Tz>,
    ) -> Result<BookingReceipt, BookingError> {
        let agent = self.load_agent(&request.agent_id).await?;
        let lead = self.load_lead(&request.lead_id).await?;
        self.validate_target(&agent, request.start, now)?;

        // Step 1: re-validate availability. Fail closed: a fetch fault
        // aborts the booking, it is never treated as "available".
        let available = self
            .deps
            .calendar
            .is_available(&agent, request.start, self.config.slot_minutes)
            .await?;
        if !available {
            return Err(ValidationError::SlotConflict.into());
        }

        // Step 2: conferencing resource. Non-fatal; a consultation can
        // proceed without a pre-generated link.
        let conferencing = match self
            .deps
            .conferencing
            .create_meeting(&agent, self.meeting_request(&request, &lead))
            .await
        {
            Ok(meeting) => ProvisionOutcome::Provisioned(meeting),
            Err(error) => {
                warn!(%error, step = "create_meeting", "continuing with placeholder");
                ProvisionOutcome::Placeholder
            }
        };

        // Step 3: calendar resource, embedding the real join URL when one
        // exists. Non-fatal.
        let calendar = match self
            .deps
            .calendar
            .create_event(&agent, self.event_request(&request, &lead, &conferencing))
            .await
        {
            Ok(event) => ProvisionOutcome::Provisioned(event),
            Err(error) => {
                warn!(%error, step = "create_event", "continuing without calendar event");
                ProvisionOutcome::Placeholder
            }
        };

        // Step 4: persist. The only fatal step; failure compensates the
        // real resources created above.
        let now_utc = now.with_timezone(&Utc);
        let appointment = Appointment {
            id: AppointmentId::generate(),
            lead_id: lead.id.clone(),
            agent_id: agent.id.clone(),
            start_at: request.start.with_timezone(&Utc),
            duration_minutes: self.config.slot_minutes,
            status: AppointmentStatus::Scheduled,
            notes: request.notes.clone(),
            conferencing_meeting_id: conferencing.as_provisioned().map(|m| m.id.clone()),
            conferencing_join_url: match &conferencing {
                ProvisionOutcome::Provisioned(m) => Some(m.join_url.clone()),
                _ => Some(PLACEHOLDER_JOIN_URL.to_string()),
            },
            calendar_event_id: calendar.as_provisioned().map(|e| e.id.clone()),
            created_at: now_utc,
            updated_at: now_utc,
        };

        if let Err(fault) = self.persist_insert(&appointment).await {
            let compensation = self.compensate(&agent, &conferencing, &calendar).await;
            return Err(self.persistence_failure(fault, compensation));
        }

        // Step 5: lead side effects. Non-fatal: the appointment is already
        // durably recorded.
        self.settle_lead(&lead.id, LeadStatus::Booked, now_utc).await;

        info!(
            appointment = %appointment.id.0,
            agent = %agent.id.0,
            lead = %lead.id.0,
            start = %appointment.start_at,
            "appointment booked"
        );
        Ok(BookingReceipt { appointment, conferencing, calendar })
    }

    // ---- reschedule ------------------------------------------------------

    pub async fn reschedule(
        &self,
        appointment_id: &AppointmentId,
        new_start: DateTime<Tz>,
        reason: &str,
    ) -> Result<BookingReceipt, BookingError> {
        self.reschedule_at(appointment_id, new_start, reason, self.clock.now()).await
    }

    pub async fn reschedule_at(
        &self,
        appointment_id: &AppointmentId,
        new_start: DateTime<Tz>,
        reason: &str,
        now: DateTime<Tz>,
    ) -> Result<BookingReceipt, BookingError> {
        let mut appointment = self.load_appointment(appointment_id).await?;
        let agent = self.load_agent(&appointment.agent_id).await?;

        if !appointment.can_transition_to(AppointmentStatus::Rescheduled) {
            return Err(ValidationError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Rescheduled,
            }
            .into());
        }
        self.validate_target(&agent, new_start, now)?;

        // Availability at the new instant, excluding the appointment's own
        // current slot so moving within one's own hold is allowed.
        let new_end = new_start + Duration::minutes(self.config.slot_minutes);
        let busy = self.deps.calendar.busy_intervals(&agent, new_start, new_end).await?;
        let old_start = self.clock.to_business_time(appointment.start_at);
        let old_end = old_start + Duration::minutes(appointment.duration_minutes);
        let conflicted = busy
            .iter()
            .filter(|b| !(b.start == old_start && b.end == old_end))
            .any(|b| b.overlaps(new_start, new_end));
        if conflicted {
            return Err(ValidationError::SlotConflict.into());
        }

        // Old calendar event goes first, best-effort.
        if let Some(event_id) = appointment.calendar_event_id.clone() {
            if let Err(error) = self.deps.calendar.delete_event(&agent, &event_id).await {
                warn!(%error, %event_id, "old calendar event not deleted during reschedule");
            }
        }

        // Conferencing policy: always recreate, so the join URL always
        // reflects the booked time.
        if let Some(meeting_id) = appointment.conferencing_meeting_id.clone() {
            if let Err(error) = self.deps.conferencing.delete_meeting(&agent, &meeting_id).await {
                warn!(%error, %meeting_id, "old meeting not deleted during reschedule");
            }
        }
        let lead = self.load_lead(&appointment.lead_id).await?;
        let meeting_request = MeetingRequest {
            topic: format!("Consultation with {}", lead.display_name),
            start: new_start,
            duration_minutes: self.config.slot_minutes,
            agenda: format!("Rescheduled: {reason}"),
        };
        let conferencing =
            match self.deps.conferencing.create_meeting(&agent, meeting_request).await {
                Ok(meeting) => ProvisionOutcome::Provisioned(meeting),
                Err(error) => {
                    warn!(%error, step = "create_meeting", "continuing with placeholder");
                    ProvisionOutcome::Placeholder
                }
            };

        let description = match conferencing.as_provisioned() {
            Some(meeting) => format!(
                "Rescheduled from {} ({}). Join: {}",
                format_display(&old_start),
                reason,
                meeting.join_url
            ),
            None => {
                format!("Rescheduled from {} ({}). Join link to follow.", format_display(&old_start), reason)
            }
        };
        let event_request = CalendarEventRequest {
            summary: format!("Consultation with {}", lead.display_name),
            description,
            start: new_start,
            end: new_end,
        };
        let calendar = match self.deps.calendar.create_event(&agent, event_request).await {
            Ok(event) => ProvisionOutcome::Provisioned(event),
            Err(error) => {
                warn!(%error, step = "create_event", "continuing without calendar event");
                ProvisionOutcome::Placeholder
            }
        };

        let now_utc = now.with_timezone(&Utc);
        appointment.start_at = new_start.with_timezone(&Utc);
        appointment.transition_to(AppointmentStatus::Rescheduled)?;
        appointment.append_note(&format!("Rescheduled: {reason}"));
        appointment.conferencing_meeting_id =
            conferencing.as_provisioned().map(|m| m.id.clone());
        appointment.conferencing_join_url = match &conferencing {
            ProvisionOutcome::Provisioned(m) => Some(m.join_url.clone()),
            _ => Some(PLACEHOLDER_JOIN_URL.to_string()),
        };
        appointment.calendar_event_id = calendar.as_provisioned().map(|e| e.id.clone());
        appointment.updated_at = now_utc;

        if let Err(fault) = self.persist_update(&appointment).await {
            let compensation = self.compensate(&agent, &conferencing, &calendar).await;
            return Err(self.persistence_failure(fault, compensation));
        }

        info!(
            appointment = %appointment.id.0,
            start = %appointment.start_at,
            "appointment rescheduled"
        );
        Ok(BookingReceipt { appointment, conferencing, calendar })
    }

    // ---- cancel ----------------------------------------------------------

    pub async fn cancel(
        &self,
        appointment_id: &AppointmentId,
        reason: &str,
        notify: bool,
    ) -> Result<Appointment, BookingError> {
        self.cancel_at(appointment_id, reason, notify, self.clock.now()).await
    }

    pub async fn cancel_at(
        &self,
        appointment_id: &AppointmentId,
        reason: &str,
        notify: bool,
        now: DateTime<Tz>,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.load_appointment(appointment_id).await?;
        let agent = self.load_agent(&appointment.agent_id).await?;
        let lead = self.load_lead(&appointment.lead_id).await?;

        if !appointment.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(ValidationError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Cancelled,
            }
            .into());
        }

        // Both deletes are attempted regardless of individual failures.
        if let Some(meeting_id) = appointment.conferencing_meeting_id.clone() {
            if let Err(error) = self.deps.conferencing.delete_meeting(&agent, &meeting_id).await {
                warn!(%error, %meeting_id, "meeting not deleted during cancellation");
            }
        }
        if let Some(event_id) = appointment.calendar_event_id.clone() {
            if let Err(error) = self.deps.calendar.delete_event(&agent, &event_id).await {
                warn!(%error, %event_id, "calendar event not deleted during cancellation");
            }
        }

        let now_utc = now.with_timezone(&Utc);
        appointment.transition_to(AppointmentStatus::Cancelled)?;
        appointment.append_note(&format!("Cancelled: {reason}"));
        appointment.updated_at = now_utc;

        if let Err(fault) = self.persist_update(&appointment).await {
            return Err(self.persistence_failure(fault, Vec::new()));
        }

        self.settle_lead(&lead.id, LeadStatus::AppointmentCancelled, now_utc).await;

        if notify {
            let start_local = self.clock.to_business_time(appointment.start_at);
            let text = format!(
                "Your consultation on {} has been cancelled. Reason: {reason}",
                format_display(&start_local)
            );
            // Fire-and-forget: delivery problems never fail a cancellation.
            if let Err(error) = self.deps.notifier.send(&lead.contact_address, &text).await {
                warn!(%error, lead = %lead.id.0, "cancellation notification not delivered");
            }
        }

        info!(appointment = %appointment.id.0, "appointment cancelled");
        Ok(appointment)
    }

    // ---- slot offers -----------------------------------------------------

    /// Record an alternative slot proposed to a lead, superseding any
    /// pending offer.
    pub async fn offer_slot(
        &self,
        lead_id: &LeadId,
        agent_id: &AgentId,
        slot_start: DateTime<Tz>,
    ) -> Result<SlotOffer, BookingError> {
        let lead = self.load_lead(lead_id).await?;
        let agent = self.load_agent(agent_id).await?;
        let now_utc = self.clock.now().with_timezone(&Utc);
        let offer = SlotOffer::new(
            lead.id,
            agent.id,
            slot_start.with_timezone(&Utc),
            self.config.slot_minutes,
            self.config.offer_ttl_hours,
            now_utc,
        );
        self.deps.offers.put(offer.clone()).await.map_err(persistence_error)?;
        Ok(offer)
    }

    /// The lead's pending, unexpired offer. An expired offer is cleared
    /// and reported as absent.
    pub async fn pending_offer(&self, lead_id: &LeadId) -> Result<Option<SlotOffer>, BookingError> {
        let offer = self.deps.offers.find_for_lead(lead_id).await.map_err(persistence_error)?;
        let now_utc = self.clock.now().with_timezone(&Utc);
        match offer {
            Some(offer) if offer.is_expired(now_utc) => {
                self.deps.offers.clear_for_lead(lead_id).await.map_err(persistence_error)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    // ---- internals -------------------------------------------------------

    /// Target instant must be in the future, beyond the booking buffer,
    /// and inside the agent's working window.
    fn validate_target(
        &self,
        agent: &Agent,
        start: DateTime<Tz>,
        now: DateTime<Tz>,
    ) -> Result<(), ValidationError> {
        agent.working_hours.validate()?;
        if start <= now {
            return Err(ValidationError::PastInstant(format_display(&start)));
        }
        if start <= now + Duration::minutes(self.config.buffer_minutes) {
            return Err(ValidationError::TooSoon { buffer_minutes: self.config.buffer_minutes });
        }
        let (window_start, window_end) = agent
            .working_hours
            .window_for(&start)
            .ok_or(ValidationError::OutsideWorkingHours)?;
        let end = start + Duration::minutes(self.config.slot_minutes);
        if start < window_start || end > window_end {
            return Err(ValidationError::OutsideWorkingHours);
        }
        Ok(())
    }

    fn meeting_request(&self, request: &BookingRequest, lead: &Lead) -> MeetingRequest {
        MeetingRequest {
            topic: format!("Consultation with {}", lead.display_name),
            start: request.start,
            duration_minutes: self.config.slot_minutes,
            agenda: request.notes.clone(),
        }
    }

    fn event_request(
        &self,
        request: &BookingRequest,
        lead: &Lead,
        conferencing: &ProvisionOutcome<Meeting>,
    ) -> CalendarEventRequest {
        let description = match conferencing.as_provisioned() {
            Some(meeting) => format!("Lead: {}. Join: {}", lead.display_name, meeting.join_url),
            None => format!("Lead: {}. Join link to follow.", lead.display_name),
        };
        CalendarEventRequest {
            summary: format!("Consultation with {}", request.display_name),
            description,
            start: request.start,
            end: request.start + Duration::minutes(self.config.slot_minutes),
        }
    }

    async fn persist_insert(&self, appointment: &Appointment) -> Result<(), PersistFault> {
        let attempts = AtomicU32::new(0);
        retry_with_backoff(&self.backoff, "appointment_insert", || {
            let appointment = appointment.clone();
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                self.deps.appointments.insert(appointment).await.map_err(|error| PersistFault {
                    error,
                    attempts: attempt,
                })
            }
        })
        .await
    }

    async fn persist_update(&self, appointment: &Appointment) -> Result<(), PersistFault> {
        let attempts = AtomicU32::new(0);
        retry_with_backoff(&self.backoff, "appointment_update", || {
            let appointment = appointment.clone();
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                self.deps.appointments.update(appointment).await.map_err(|error| PersistFault {
                    error,
                    attempts: attempt,
                })
            }
        })
        .await
    }

    /// A lost booking race surfaces as a validation error; anything else
    /// is a failed transaction carrying the compensation report.
    fn persistence_failure(
        &self,
        fault: PersistFault,
        compensation: Vec<CompensationAction>,
    ) -> BookingError {
        match fault.error {
            RepositoryError::Conflict(_) => ValidationError::SlotTaken.into(),
            other => TransactionFailedError {
                attempts: fault.attempts,
                cause: other.to_string(),
                compensation,
            }
            .into(),
        }
    }

    /// Best-effort deletion of real resources created earlier in a failed
    /// sequence. Every attempt is logged; failures never mask the original
    /// fatal error.
    async fn compensate(
        &self,
        agent: &Agent,
        conferencing: &ProvisionOutcome<Meeting>,
        calendar: &ProvisionOutcome<CalendarEvent>,
    ) -> Vec<CompensationAction> {
        let mut actions = Vec::new();

        if let Some(meeting) = conferencing.as_provisioned() {
            let succeeded = match self.deps.conferencing.delete_meeting(agent, &meeting.id).await {
                Ok(()) => true,
                Err(error) => {
                    warn!(%error, meeting_id = %meeting.id, "compensation delete failed");
                    false
                }
            };
            actions.push(CompensationAction {
                system: ExternalSystem::Conferencing,
                resource_id: meeting.id.clone(),
                succeeded,
            });
        }
        if let Some(event) = calendar.as_provisioned() {
            let succeeded = match self.deps.calendar.delete_event(agent, &event.id).await {
                Ok(()) => true,
                Err(error) => {
                    warn!(%error, event_id = %event.id, "compensation delete failed");
                    false
                }
            };
            actions.push(CompensationAction {
                system: ExternalSystem::Calendar,
                resource_id: event.id.clone(),
                succeeded,
            });
        }

        actions
    }

    /// Lead status update and offer clearing after a durable write. Logged
    /// but never fatal.
    async fn settle_lead(&self, lead_id: &LeadId, status: LeadStatus, now_utc: DateTime<Utc>) {
        if let Err(error) = self.deps.leads.update_status(lead_id, status, now_utc).await {
            warn!(%error, lead = %lead_id.0, "lead status not updated");
        }
        if let Err(error) = self.deps.offers.clear_for_lead(lead_id).await {
            warn!(%error, lead = %lead_id.0, "pending offer not cleared");
        }
    }

    async fn load_agent(&self, id: &AgentId) -> Result<Agent, BookingError> {
        self.deps
            .agents
            .find_by_id(id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| NotFoundError::Agent(id.0.clone()).into())
    }

    async fn load_lead(&self, id: &LeadId) -> Result<Lead, BookingError> {
        self.deps
            .leads
            .find_by_id(id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| NotFoundError::Lead(id.0.clone()).into())
    }

    async fn load_appointment(&self, id: &AppointmentId) -> Result<Appointment, BookingError> {
        self.deps
            .appointments
            .find_by_id(id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| NotFoundError::Appointment(id.0.clone()).into())
    }
}

fn persistence_error(error: RepositoryError) -> BookingError {
    BookingError::Persistence(error.to_string())
}
