//! Audit sinks for login events.

use std::sync::RwLock;

use warden_auth::{AuditError, AuditSink, LoginEvent, LoginOutcome};

/// Writes every login event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_login_event(&self, event: LoginEvent) -> Result<(), AuditError> {
        match event.outcome {
            LoginOutcome::Success => tracing::info!(
                target: "warden::audit",
                outcome = "success",
                user_id = ?event.user_id,
                tenant_id = ?event.tenant_id,
                identity_id = ?event.identity_id,
                login_type = %event.login_type,
                client_source = %event.client_source,
                client_ip = ?event.client_ip,
                occurred_at = %event.occurred_at,
                "login event"
            ),
            LoginOutcome::Failure => tracing::warn!(
                target: "warden::audit",
                outcome = "failure",
                user_id = ?event.user_id,
                tenant_id = ?event.tenant_id,
                identity_id = ?event.identity_id,
                login_type = %event.login_type,
                client_source = %event.client_source,
                client_ip = ?event.client_ip,
                reason = event.reason.as_deref().unwrap_or(""),
                occurred_at = %event.occurred_at,
                "login event"
            ),
        }
        Ok(())
    }
}

/// Keeps events in memory; tests inspect them afterwards.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: RwLock<Vec<LoginEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LoginEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<LoginEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.outcome == LoginOutcome::Failure)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_login_event(&self, event: LoginEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| AuditError("audit buffer lock poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }
}

/// Sink that rejects every event (exercises the engine's error swallowing).
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn record_login_event(&self, _event: LoginEvent) -> Result<(), AuditError> {
        Err(AuditError("audit backend unavailable".to_string()))
    }
}
