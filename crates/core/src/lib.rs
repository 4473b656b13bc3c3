pub mod config;
pub mod domain;
pub mod errors;
pub mod parser;
pub mod slots;
pub mod timewindow;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::agent::{Agent, AgentId, WorkingHours};
pub use domain::appointment::{Appointment, AppointmentId, AppointmentStatus};
pub use domain::interval::{BusyInterval, CandidateSlot};
pub use domain::lead::{Lead, LeadId, LeadStatus};
pub use domain::offer::{SlotOffer, SlotOfferId};
pub use errors::{
    BookingError, CompensationAction, ExternalServiceError, ExternalSystem, NotFoundError,
    TransactionFailedError, ValidationError,
};
pub use parser::parse_preferred_time;
pub use slots::{generate_candidates, search_window, SchedulingConfig};
pub use timewindow::{format_display, format_offset, BusinessClock};
