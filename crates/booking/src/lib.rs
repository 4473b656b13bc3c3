//! Slot search and the booking transaction.
//!
//! `SlotFinder` turns one batched busy-time fetch into ranked candidate
//! slots; `BookingOrchestrator` runs the create/reschedule/cancel sequences
//! across the calendar, conferencing, and record-store collaborators with
//! compensation on fatal persistence failure.

pub mod finder;
pub mod orchestrator;

pub use finder::SlotFinder;
pub use orchestrator::{
    BookingOrchestrator, BookingReceipt, BookingRequest, OrchestratorDeps, ProvisionOutcome,
    PLACEHOLDER_JOIN_URL,
};
