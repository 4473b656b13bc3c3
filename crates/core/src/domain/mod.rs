pub mod agent;
pub mod appointment;
pub mod interval;
pub mod lead;
pub mod offer;
