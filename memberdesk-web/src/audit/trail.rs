//! Per-request audit trail
//!
//! A shared slot threaded through request extensions. The completion
//! layer creates it, the authentication layer attaches the actor,
//! handlers deposit an intent after their effect succeeds, and the
//! completion layer drains it exactly once after the response.

use std::sync::{Arc, Mutex};

use memberdesk_core::{AuditIntent, Principal};

/// Cloneable handle to the request's audit slot
#[derive(Clone, Default)]
pub struct AuditTrail {
    state: Arc<Mutex<TrailState>>,
}

#[derive(Default)]
struct TrailState {
    actor: Option<Principal>,
    intent: Option<AuditIntent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the acting principal. Set by the authentication layer,
    /// or by the login handler where authentication has nothing to go on.
    pub fn set_actor(&self, principal: Principal) {
        self.state.lock().unwrap().actor = Some(principal);
    }

    /// Declare what this request did. A second call replaces the first;
    /// one request produces at most one event.
    pub fn record(&self, intent: AuditIntent) {
        self.state.lock().unwrap().intent = Some(intent);
    }

    /// Drain actor and intent. The completion layer calls this once.
    pub fn take(&self) -> (Option<Principal>, Option<AuditIntent>) {
        let mut state = self.state.lock().unwrap();
        (state.actor.take(), state.intent.take())
    }
}
