//! Background Tasks Module
//!
//! Periodic drivers for the core's optional housekeeping.

mod maintenance;

pub use maintenance::{run_maintenance, spawn_maintenance_task, MaintenanceReport};
