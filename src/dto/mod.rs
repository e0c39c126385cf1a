//! Request and response bodies exchanged over HTTP and SSE.

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Combat request and outcome.
pub mod combat;
/// Enemy catalog bodies.
pub mod enemy;
/// Shared progress bodies.
pub mod global;
/// Health check body.
pub mod health;
pub mod player;
/// Quest board bodies.
pub mod quest;
/// SSE envelopes and event payloads.
pub mod sse;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
