//! Request and Response models for the status API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{SettingsUpdate, MAX_SETTING_KEY_LEN};
pub use responses::{
    CancelTaskResponse, ClearCacheResponse, ErrorResponse, HealthResponse, MessageResponse,
    SettingsResponse, StatsResponse,
};
