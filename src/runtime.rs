//! Live session management
//!
//! Each conversation gets its own `Session` behind an async mutex, so at
//! most one operation runs against it at a time. The in-flight turn's
//! cancellation token lives outside that mutex so a cancel request does
//! not queue behind the turn it is trying to stop.

use crate::llm::ModelRegistry;
use crate::session::{Generator, MeteredGenerator, Session, SessionConfig};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Builds the model collaborator for a new session
pub type GeneratorFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Arc<dyn Generator>, String> + Send + Sync>;

/// Factory backed by the model registry
pub fn registry_factory(registry: Arc<ModelRegistry>) -> GeneratorFactory {
    Arc::new(move |model: Option<&str>| -> Result<Arc<dyn Generator>, String> {
        let service = match model {
            Some(id) => registry
                .get(id)
                .ok_or_else(|| format!("Unknown or unconfigured model: {id}"))?,
            None => registry.default().ok_or_else(|| {
                format!(
                    "Default model {} is not available (is OPENAI_API_KEY set?)",
                    registry.default_model_id()
                )
            })?,
        };
        Ok(Arc::new(MeteredGenerator::new(service)) as Arc<dyn Generator>)
    })
}

/// One live conversation
pub struct SessionHandle {
    pub session: Mutex<Session>,
    /// Never held across an await
    in_flight: std::sync::Mutex<Option<CancellationToken>>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            in_flight: std::sync::Mutex::new(None),
        }
    }

    /// Register a fresh token for the turn about to start.
    ///
    /// Call while holding the session lock. The slot is cleared when the
    /// returned guard drops, including when the request future is dropped
    /// mid-turn.
    pub fn begin_turn(&self) -> InFlightTurn<'_> {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        InFlightTurn {
            handle: self,
            token,
        }
    }

    /// Cancel the in-flight turn, if any
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of a running turn in its session's cancellation slot
pub struct InFlightTurn<'a> {
    handle: &'a SessionHandle,
    token: CancellationToken,
}

impl InFlightTurn<'_> {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for InFlightTurn<'_> {
    fn drop(&mut self) {
        self.handle.slot().take();
    }
}

/// Manager for all live sessions
pub struct SessionManager {
    factory: GeneratorFactory,
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionManager {
    pub fn new(factory: GeneratorFactory, config: SessionConfig) -> Self {
        Self {
            factory,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new independent session
    pub async fn create(&self, model: Option<&str>) -> Result<(String, String), String> {
        let generator = (self.factory)(model)?;
        let model_id = generator.model_id().to_string();
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(&id, self.config.clone(), generator);

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(SessionHandle::new(session)));

        tracing::info!(session_id = %id, model = %model_id, "Session created");
        Ok((id, model_id))
    }

    pub async fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if let Some(handle) = &removed {
            handle.cancel();
            tracing::info!(session_id = %id, "Session closed");
        }
        removed.is_some()
    }

    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
