//! Async slot search: one batched busy fetch, then pure enumeration.

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

use slotly_connect::AvailabilitySource;
use slotly_core::domain::agent::Agent;
use slotly_core::domain::interval::CandidateSlot;
use slotly_core::errors::BookingError;
use slotly_core::slots::{generate_candidates, search_window, SchedulingConfig};
use slotly_core::timewindow::BusinessClock;

pub struct SlotFinder {
    availability: Arc<dyn AvailabilitySource>,
    clock: BusinessClock,
    config: SchedulingConfig,
}

impl SlotFinder {
    pub fn new(
        availability: Arc<dyn AvailabilitySource>,
        clock: BusinessClock,
        config: SchedulingConfig,
    ) -> Self {
        Self { availability, clock, config }
    }

    /// Up to `max_results` bookable slots for the agent, ranked by distance
    /// to `preferred` when given, chronological otherwise.
    ///
    /// Fails closed: an availability fetch fault is an error, never an
    /// empty success, so callers can distinguish "no slots" from "the
    /// calendar is down".
    pub async fn find_slots(
        &self,
        agent: &Agent,
        preferred: Option<DateTime<Tz>>,
    ) -> Result<Vec<CandidateSlot>, BookingError> {
        self.find_slots_at(agent, preferred, self.clock.now()).await
    }

    /// As `find_slots`, with an explicit `now` for deterministic callers.
    pub async fn find_slots_at(
        &self,
        agent: &Agent,
        preferred: Option<DateTime<Tz>>,
        now: DateTime<Tz>,
    ) -> Result<Vec<CandidateSlot>, BookingError> {
        agent.working_hours.validate()?;

        let Some((search_start, search_end)) =
            search_window(&agent.working_hours, preferred, now, &self.config)
        else {
            return Ok(Vec::new());
        };

        // The single batched call; candidate enumeration afterwards is
        // purely in-memory.
        let busy =
            self.availability.busy_intervals(agent, search_start, search_end).await?;
        debug!(
            agent = %agent.id.0,
            busy_count = busy.len(),
            %search_start,
            %search_end,
            "fetched busy intervals for slot search"
        );

        Ok(generate_candidates(&agent.working_hours, &busy, preferred, now, &self.config))
    }
}
