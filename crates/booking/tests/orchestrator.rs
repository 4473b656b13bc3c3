//! End-to-end orchestrator and finder tests over recording fakes and the
//! in-memory repositories.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use slotly_booking::{
    BookingOrchestrator, BookingRequest, OrchestratorDeps, ProvisionOutcome, SlotFinder,
    PLACEHOLDER_JOIN_URL,
};
use slotly_connect::{
    AvailabilitySource, BackoffPolicy, CalendarEvent, CalendarEventRequest, CalendarService,
    ConferencingService, Meeting, MeetingRequest, Notifier,
};
use slotly_core::domain::agent::{Agent, AgentId, WorkingHours};
use slotly_core::domain::appointment::{
    Appointment, AppointmentId, AppointmentStatus,
};
use slotly_core::domain::lead::{Lead, LeadId, LeadStatus};
use slotly_core::domain::offer::SlotOffer;
use slotly_core::errors::{BookingError, ExternalServiceError, ExternalSystem, ValidationError};
use slotly_core::slots::SchedulingConfig;
use slotly_core::timewindow::BusinessClock;
use slotly_core::BusyInterval;
use slotly_db::repositories::{
    AgentRepository, AppointmentRepository, InMemoryAgentRepository,
    InMemoryAppointmentRepository, InMemoryLeadRepository, InMemorySlotOfferRepository,
    LeadRepository, RepositoryError, SlotOfferRepository,
};

const ZONE: Tz = chrono_tz::Asia::Singapore;

/// Monday 2024-06-17 in the business zone.
fn at(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    ZONE.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
}

fn monday_10am() -> DateTime<Tz> {
    at(17, 10, 0)
}

fn agent() -> Agent {
    Agent {
        id: AgentId("agent-1".into()),
        display_name: "Dana".into(),
        working_hours: WorkingHours::new(9, 18, [0, 1, 2, 3, 4]).unwrap(),
        conferencing_host_id: "host-1".into(),
        calendar_id: "cal-1".into(),
    }
}

fn lead() -> Lead {
    Lead {
        id: LeadId("lead-1".into()),
        display_name: "Morgan".into(),
        contact_address: "+6591234567".into(),
        status: LeadStatus::Engaged,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn request(start: DateTime<Tz>) -> BookingRequest {
    BookingRequest {
        lead_id: LeadId("lead-1".into()),
        agent_id: AgentId("agent-1".into()),
        start,
        display_name: "Morgan".into(),
        notes: "initial consultation".into(),
    }
}

fn permanent_fault(system: ExternalSystem, operation: &'static str) -> ExternalServiceError {
    ExternalServiceError::permanent(system, operation, "injected".into())
}

#[derive(Default)]
struct FakeCalendar {
    busy: Mutex<Vec<BusyInterval>>,
    fail_busy: bool,
    fail_create: bool,
    fail_delete: bool,
    created: AtomicU32,
    deleted: Mutex<Vec<String>>,
}

impl FakeCalendar {
    fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self { busy: Mutex::new(busy), ..Self::default() }
    }

    fn set_busy(&self, busy: Vec<BusyInterval>) {
        *self.busy.lock().unwrap() = busy;
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvailabilitySource for FakeCalendar {
    async fn busy_intervals(
        &self,
        _agent: &Agent,
        _start: DateTime<Tz>,
        _end: DateTime<Tz>,
    ) -> Result<Vec<BusyInterval>, ExternalServiceError> {
        if self.fail_busy {
            return Err(permanent_fault(ExternalSystem::Calendar, "busy_intervals"));
        }
        Ok(self.busy.lock().unwrap().clone())
    }
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn create_event(
        &self,
        _agent: &Agent,
        _request: CalendarEventRequest,
    ) -> Result<CalendarEvent, ExternalServiceError> {
        if self.fail_create {
            return Err(permanent_fault(ExternalSystem::Calendar, "create_event"));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CalendarEvent { id: format!("evt-{n}") })
    }

    async fn delete_event(
        &self,
        _agent: &Agent,
        event_id: &str,
    ) -> Result<(), ExternalServiceError> {
        self.deleted.lock().unwrap().push(event_id.to_string());
        if self.fail_delete {
            return Err(permanent_fault(ExternalSystem::Calendar, "delete_event"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeConferencing {
    fail_create: bool,
    fail_delete: bool,
    created: AtomicU32,
    deleted: Mutex<Vec<String>>,
}

impl FakeConferencing {
    fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConferencingService for FakeConferencing {
    async fn create_meeting(
        &self,
        _agent: &Agent,
        _request: MeetingRequest,
    ) -> Result<Meeting, ExternalServiceError> {
        if self.fail_create {
            return Err(permanent_fault(ExternalSystem::Conferencing, "create_meeting"));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Meeting {
            id: format!("mtg-{n}"),
            join_url: format!("https://meet.example/mtg-{n}"),
            passcode: None,
        })
    }

    async fn delete_meeting(
        &self,
        _agent: &Agent,
        meeting_id: &str,
    ) -> Result<(), ExternalServiceError> {
        self.deleted.lock().unwrap().push(meeting_id.to_string());
        if self.fail_delete {
            return Err(permanent_fault(ExternalSystem::Conferencing, "delete_meeting"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ExternalServiceError> {
        self.messages.lock().unwrap().push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

/// Every write fails with a retryable store fault; reads are empty.
#[derive(Default)]
struct FailingAppointmentRepository {
    calls: AtomicU32,
}

#[async_trait]
impl AppointmentRepository for FailingAppointmentRepository {
    async fn find_by_id(
        &self,
        _id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        Ok(None)
    }

    async fn insert(&self, _appointment: Appointment) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn update(&self, _appointment: Appointment) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// Every write fails with a non-retryable decode fault; reads are empty.
#[derive(Default)]
struct CorruptAppointmentRepository {
    calls: AtomicU32,
}

#[async_trait]
impl AppointmentRepository for CorruptAppointmentRepository {
    async fn find_by_id(
        &self,
        _id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        Ok(None)
    }

    async fn insert(&self, _appointment: Appointment) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Decode("bad timestamp in `start_at`".to_string()))
    }

    async fn update(&self, _appointment: Appointment) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Decode("bad timestamp in `start_at`".to_string()))
    }
}

struct Harness {
    calendar: Arc<FakeCalendar>,
    conferencing: Arc<FakeConferencing>,
    notifier: Arc<RecordingNotifier>,
    leads: Arc<InMemoryLeadRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    offers: Arc<InMemorySlotOfferRepository>,
    orchestrator: BookingOrchestrator,
}

async fn harness_with(
    calendar: FakeCalendar,
    conferencing: FakeConferencing,
    appointments: Arc<dyn AppointmentRepository>,
) -> Harness {
    let calendar = Arc::new(calendar);
    let conferencing = Arc::new(conferencing);
    let notifier = Arc::new(RecordingNotifier::default());
    let agents = Arc::new(InMemoryAgentRepository::default());
    let leads = Arc::new(InMemoryLeadRepository::default());
    let offers = Arc::new(InMemorySlotOfferRepository::default());

    agents.save(agent()).await.unwrap();
    leads.save(lead()).await.unwrap();

    let deps = OrchestratorDeps {
        calendar: calendar.clone(),
        conferencing: conferencing.clone(),
        notifier: notifier.clone(),
        agents,
        leads: leads.clone(),
        appointments: appointments.clone(),
        offers: offers.clone(),
    };
    let orchestrator = BookingOrchestrator::new(
        deps,
        BusinessClock::with_zone(ZONE),
        SchedulingConfig::default(),
        BackoffPolicy { max_attempts: 2, base_delay_ms: 1, max_delay_ms: 1 },
    );

    Harness { calendar, conferencing, notifier, leads, appointments, offers, orchestrator }
}

async fn harness() -> Harness {
    harness_with(
        FakeCalendar::default(),
        FakeConferencing::default(),
        Arc::new(InMemoryAppointmentRepository::default()),
    )
    .await
}

#[tokio::test]
async fn create_books_an_open_working_hours_slot() {
    let h = harness().await;
    h.orchestrator
        .offer_slot(&LeadId("lead-1".into()), &AgentId("agent-1".into()), at(18, 11, 0))
        .await
        .unwrap();

    let receipt = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap();

    assert_eq!(receipt.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(receipt.appointment.start_at, at(17, 11, 0).with_timezone(&Utc));
    assert!(receipt.conferencing.is_provisioned());
    assert!(receipt.calendar.is_provisioned());
    assert_eq!(
        receipt.appointment.conferencing_join_url.as_deref(),
        Some("https://meet.example/mtg-1")
    );

    let stored = h.appointments.find_by_id(&receipt.appointment.id).await.unwrap().unwrap();
    assert_eq!(stored, receipt.appointment);

    let lead = h.leads.find_by_id(&LeadId("lead-1".into())).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Booked);
    // Confirming a booking clears the pending offer.
    assert!(h.offers.find_for_lead(&LeadId("lead-1".into())).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_a_start_inside_the_booking_buffer() {
    let h = harness().await;
    let err = h.orchestrator.create_at(request(at(17, 10, 15)), monday_10am()).await.unwrap_err();
    assert_eq!(
        err,
        BookingError::Validation(ValidationError::TooSoon { buffer_minutes: 30 })
    );
}

#[tokio::test]
async fn create_rejects_starts_outside_working_hours() {
    let h = harness().await;
    // Before opening on a working day.
    let early = h.orchestrator.create_at(request(at(18, 8, 0)), monday_10am()).await.unwrap_err();
    assert_eq!(early, BookingError::Validation(ValidationError::OutsideWorkingHours));
    // Saturday is not an active weekday.
    let weekend =
        h.orchestrator.create_at(request(at(22, 11, 0)), monday_10am()).await.unwrap_err();
    assert_eq!(weekend, BookingError::Validation(ValidationError::OutsideWorkingHours));
    // A slot ending past closing time.
    let closing =
        h.orchestrator.create_at(request(at(17, 17, 30)), monday_10am()).await.unwrap_err();
    assert_eq!(closing, BookingError::Validation(ValidationError::OutsideWorkingHours));
}

#[tokio::test]
async fn create_stops_before_any_provisioning_when_the_slot_is_busy() {
    let h = harness_with(
        FakeCalendar::with_busy(vec![BusyInterval { start: at(17, 11, 0), end: at(17, 12, 0) }]),
        FakeConferencing::default(),
        Arc::new(InMemoryAppointmentRepository::default()),
    )
    .await;

    let err = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap_err();
    assert_eq!(err, BookingError::Validation(ValidationError::SlotConflict));
    assert_eq!(h.conferencing.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.calendar.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_fails_closed_when_the_availability_read_faults() {
    let h = harness_with(
        FakeCalendar { fail_busy: true, ..FakeCalendar::default() },
        FakeConferencing::default(),
        Arc::new(InMemoryAppointmentRepository::default()),
    )
    .await;

    let err = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap_err();
    assert!(matches!(err, BookingError::External(_)));
    assert_eq!(h.conferencing.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn conferencing_outage_degrades_to_a_placeholder_booking() {
    let h = harness_with(
        FakeCalendar::default(),
        FakeConferencing { fail_create: true, ..FakeConferencing::default() },
        Arc::new(InMemoryAppointmentRepository::default()),
    )
    .await;

    let receipt = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap();

    assert_eq!(receipt.conferencing, ProvisionOutcome::Placeholder);
    assert!(receipt.calendar.is_provisioned());
    assert_eq!(receipt.appointment.conferencing_meeting_id, None);
    assert_eq!(receipt.appointment.conferencing_join_url.as_deref(), Some(PLACEHOLDER_JOIN_URL));
    // The booking itself is durable.
    assert!(h.appointments.find_by_id(&receipt.appointment.id).await.unwrap().is_some());
}

#[tokio::test]
async fn fatal_persistence_failure_compensates_both_real_resources() {
    let failing = Arc::new(FailingAppointmentRepository::default());
    let h = harness_with(FakeCalendar::default(), FakeConferencing::default(), failing.clone())
        .await;

    let err = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap_err();

    let BookingError::TransactionFailed(failure) = err else {
        panic!("expected a failed transaction, got {err:?}");
    };
    assert_eq!(failure.attempts, 2);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    assert_eq!(failure.compensation.len(), 2);
    assert!(failure.compensation.iter().all(|a| a.succeeded));
    assert_eq!(h.conferencing.deleted_ids(), vec!["mtg-1".to_string()]);
    assert_eq!(h.calendar.deleted_ids(), vec!["evt-1".to_string()]);
}

#[tokio::test]
async fn non_retryable_store_fault_reports_one_attempt() {
    let corrupt = Arc::new(CorruptAppointmentRepository::default());
    let h = harness_with(FakeCalendar::default(), FakeConferencing::default(), corrupt.clone())
        .await;

    let err = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap_err();

    let BookingError::TransactionFailed(failure) = err else {
        panic!("expected a failed transaction, got {err:?}");
    };
    // A decode fault aborts immediately; the error must not claim the
    // whole retry budget was spent.
    assert_eq!(failure.attempts, 1);
    assert_eq!(corrupt.calls.load(Ordering::SeqCst), 1);
    assert_eq!(failure.compensation.len(), 2);
}

#[tokio::test]
async fn losing_the_booking_race_surfaces_as_slot_taken() {
    let appointments = Arc::new(InMemoryAppointmentRepository::default());
    let rival = Appointment {
        id: AppointmentId("rival".into()),
        lead_id: LeadId("lead-2".into()),
        agent_id: AgentId("agent-1".into()),
        start_at: at(17, 11, 0).with_timezone(&Utc),
        duration_minutes: 60,
        status: AppointmentStatus::Scheduled,
        notes: String::new(),
        conferencing_meeting_id: None,
        conferencing_join_url: None,
        calendar_event_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    appointments.insert(rival).await.unwrap();

    let h = harness_with(FakeCalendar::default(), FakeConferencing::default(), appointments)
        .await;
    let err = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap_err();
    assert_eq!(err, BookingError::Validation(ValidationError::SlotTaken));
    // The uniqueness conflict still rolled the created resources back.
    assert_eq!(h.conferencing.deleted_ids().len(), 1);
    assert_eq!(h.calendar.deleted_ids().len(), 1);
}

#[tokio::test]
async fn reschedule_conflicts_with_other_busy_time() {
    let h = harness().await;
    let receipt = h.orchestrator.create_at(request(at(17, 14, 0)), monday_10am()).await.unwrap();

    // Someone else's commitment appears at 11:00; it does not match the
    // appointment's own 14:00 interval, so the conflict fires.
    h.calendar.set_busy(vec![BusyInterval { start: at(17, 11, 0), end: at(17, 12, 0) }]);
    let conflict = h
        .orchestrator
        .reschedule_at(&receipt.appointment.id, at(17, 11, 0), "earlier works", monday_10am())
        .await
        .unwrap_err();
    assert_eq!(conflict, BookingError::Validation(ValidationError::SlotConflict));
}

#[tokio::test]
async fn reschedule_within_own_slot_recreates_conferencing_and_calendar() {
    let appointments = Arc::new(InMemoryAppointmentRepository::default());
    let h = harness_with(FakeCalendar::default(), FakeConferencing::default(), appointments.clone())
        .await;
    let receipt = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap();

    // The calendar now shows the booking itself as busy time. Moving to an
    // overlapping start stays allowed because the appointment's own
    // interval is excluded from the conflict check.
    h.calendar.set_busy(vec![BusyInterval { start: at(17, 11, 0), end: at(17, 12, 0) }]);

    let moved = h
        .orchestrator
        .reschedule_at(&receipt.appointment.id, at(17, 11, 30), "slight shift", monday_10am())
        .await
        .unwrap();

    assert_eq!(moved.appointment.status, AppointmentStatus::Rescheduled);
    assert_eq!(moved.appointment.start_at, at(17, 11, 30).with_timezone(&Utc));
    assert!(moved.appointment.notes.contains("Rescheduled: slight shift"));
    // Old resources torn down, new ones issued.
    assert_eq!(h.conferencing.deleted_ids(), vec!["mtg-1".to_string()]);
    assert_eq!(h.calendar.deleted_ids(), vec!["evt-1".to_string()]);
    assert_eq!(moved.appointment.conferencing_meeting_id.as_deref(), Some("mtg-2"));
    assert_eq!(moved.appointment.calendar_event_id.as_deref(), Some("evt-2"));

    let stored = appointments.find_by_id(&receipt.appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Rescheduled);
}

#[tokio::test]
async fn cancel_attempts_both_deletes_even_when_the_first_fails() {
    let h = harness_with(
        FakeCalendar::default(),
        FakeConferencing { fail_delete: true, ..FakeConferencing::default() },
        Arc::new(InMemoryAppointmentRepository::default()),
    )
    .await;
    let receipt = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap();

    let cancelled = h
        .orchestrator
        .cancel_at(&receipt.appointment.id, "lead travelling", true, monday_10am())
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.notes.contains("Cancelled: lead travelling"));
    // The failed meeting delete did not skip the calendar delete.
    assert_eq!(h.conferencing.deleted_ids(), vec!["mtg-1".to_string()]);
    assert_eq!(h.calendar.deleted_ids(), vec!["evt-1".to_string()]);

    let lead = h.leads.find_by_id(&LeadId("lead-1".into())).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::AppointmentCancelled);

    let messages = h.notifier.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "+6591234567");
    assert!(messages[0].1.contains("cancelled"));
}

#[tokio::test]
async fn cancelled_appointments_reject_further_transitions() {
    let h = harness().await;
    let receipt = h.orchestrator.create_at(request(at(17, 11, 0)), monday_10am()).await.unwrap();
    h.orchestrator
        .cancel_at(&receipt.appointment.id, "no longer needed", false, monday_10am())
        .await
        .unwrap();

    let cancel_again = h
        .orchestrator
        .cancel_at(&receipt.appointment.id, "again", false, monday_10am())
        .await
        .unwrap_err();
    assert!(matches!(
        cancel_again,
        BookingError::Validation(ValidationError::InvalidStatusTransition { .. })
    ));

    let reschedule = h
        .orchestrator
        .reschedule_at(&receipt.appointment.id, at(18, 11, 0), "too late", monday_10am())
        .await
        .unwrap_err();
    assert!(matches!(
        reschedule,
        BookingError::Validation(ValidationError::InvalidStatusTransition { .. })
    ));
}

#[tokio::test]
async fn a_new_offer_supersedes_the_pending_one() {
    let h = harness().await;
    let lead_id = LeadId("lead-1".into());
    let agent_id = AgentId("agent-1".into());

    let first = h.orchestrator.offer_slot(&lead_id, &agent_id, at(18, 11, 0)).await.unwrap();
    let second = h.orchestrator.offer_slot(&lead_id, &agent_id, at(18, 14, 0)).await.unwrap();

    let pending = h.orchestrator.pending_offer(&lead_id).await.unwrap().unwrap();
    assert_eq!(pending.id, second.id);
    assert_ne!(pending.id, first.id);
    assert_eq!(pending.slot_start, at(18, 14, 0).with_timezone(&Utc));
}

#[tokio::test]
async fn an_expired_offer_is_cleared_and_reported_absent() {
    let h = harness().await;
    let lead_id = LeadId("lead-1".into());

    let stale = SlotOffer::new(
        lead_id.clone(),
        AgentId("agent-1".into()),
        Utc::now() + chrono::Duration::days(1),
        60,
        24,
        Utc::now() - chrono::Duration::hours(25),
    );
    h.offers.put(stale).await.unwrap();

    assert!(h.orchestrator.pending_offer(&lead_id).await.unwrap().is_none());
    assert!(h.offers.find_for_lead(&lead_id).await.unwrap().is_none());
}

#[tokio::test]
async fn finder_slots_skip_busy_time_and_pass_the_availability_check() {
    let calendar = Arc::new(FakeCalendar::with_busy(vec![BusyInterval {
        start: at(17, 11, 0),
        end: at(17, 12, 0),
    }]));
    let finder = SlotFinder::new(
        calendar.clone(),
        BusinessClock::with_zone(ZONE),
        SchedulingConfig::default(),
    );

    let slots = finder.find_slots_at(&agent(), None, monday_10am()).await.unwrap();

    assert!(!slots.is_empty());
    // 11:00 is busy; the first bookable slot past now + buffer is 12:00.
    assert_eq!(slots[0].start, at(17, 12, 0));
    for slot in &slots {
        let open = calendar
            .is_available(&agent(), slot.start, slot.duration_minutes)
            .await
            .unwrap();
        assert!(open, "offered slot {} must pass the availability check", slot.start);
    }
}

#[tokio::test]
async fn finder_fails_closed_on_a_busy_fetch_fault() {
    let calendar = Arc::new(FakeCalendar { fail_busy: true, ..FakeCalendar::default() });
    let finder =
        SlotFinder::new(calendar, BusinessClock::with_zone(ZONE), SchedulingConfig::default());

    let err = finder.find_slots_at(&agent(), None, monday_10am()).await.unwrap_err();
    assert!(matches!(err, BookingError::External(_)));
}
