//! In-process one-time code issuing and verification.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use warden_auth::{CodeChannel, CodeScene, CodeVerifier, CollaboratorError};
use warden_core::Clock;

const DEFAULT_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
struct IssuedCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// A code handed to the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    pub channel: CodeChannel,
    pub identifier: String,
    pub scene: CodeScene,
    pub code: String,
}

/// Issues six-digit codes per `(identifier, scene)` and checks them once.
///
/// Delivery is simulated: sent codes are kept for inspection instead of going
/// out over SMS or email. A new send replaces the previous code; a
/// successful verify consumes it.
pub struct InMemoryCodeVerifier {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    issued: RwLock<HashMap<(String, CodeScene), IssuedCode>>,
    outbox: RwLock<Vec<SentCode>>,
}

fn poisoned() -> CollaboratorError {
    CollaboratorError::new("code verifier lock poisoned")
}

impl InMemoryCodeVerifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            issued: RwLock::new(HashMap::new()),
            outbox: RwLock::new(Vec::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Plant a known code, bypassing delivery.
    pub fn issue(&self, identifier: &str, scene: CodeScene, code: &str) {
        let expires_at = self.clock.now() + self.ttl;
        if let Ok(mut issued) = self.issued.write() {
            issued.insert(
                (identifier.to_string(), scene),
                IssuedCode {
                    code: code.to_string(),
                    expires_at,
                },
            );
        }
    }

    /// Most recent code sent to `identifier` for `scene`.
    pub fn last_sent(&self, identifier: &str, scene: CodeScene) -> Option<String> {
        let outbox = self.outbox.read().ok()?;
        outbox
            .iter()
            .rev()
            .find(|s| s.identifier == identifier && s.scene == scene)
            .map(|s| s.code.clone())
    }

    pub fn sent(&self) -> Vec<SentCode> {
        self.outbox.read().map(|o| o.clone()).unwrap_or_default()
    }

    fn generate() -> String {
        format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
    }
}

impl CodeVerifier for InMemoryCodeVerifier {
    fn send(
        &self,
        channel: CodeChannel,
        identifier: &str,
        scene: CodeScene,
    ) -> Result<(), CollaboratorError> {
        let code = Self::generate();
        let expires_at = self.clock.now() + self.ttl;

        self.issued.write().map_err(|_| poisoned())?.insert(
            (identifier.to_string(), scene),
            IssuedCode {
                code: code.clone(),
                expires_at,
            },
        );
        self.outbox.write().map_err(|_| poisoned())?.push(SentCode {
            channel,
            identifier: identifier.to_string(),
            scene,
            code,
        });

        tracing::debug!(?channel, %scene, "code issued");
        Ok(())
    }

    fn verify(
        &self,
        identifier: &str,
        scene: CodeScene,
        code: &str,
    ) -> Result<bool, CollaboratorError> {
        let now = self.clock.now();
        let mut issued = self.issued.write().map_err(|_| poisoned())?;
        let key = (identifier.to_string(), scene);

        let Some(entry) = issued.get(&key) else {
            return Ok(false);
        };
        if entry.expires_at <= now {
            issued.remove(&key);
            return Ok(false);
        }
        if entry.code != code {
            return Ok(false);
        }

        issued.remove(&key);
        Ok(true)
    }
}
