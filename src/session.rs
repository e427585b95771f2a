//! Rendering-session ownership.
//!
//! A run either starts its own engine process or borrows one the caller
//! already holds. The difference is carried explicitly in [`Ownership`]:
//! [`SessionLease::release`] disposes an `Owned` session and leaves a
//! `Borrowed` one running. Nothing is disposed implicitly on drop.

use crate::config::EngineConfig;
use crate::engine::{EngineContext, EngineError, EngineSession, RenderingEngine};
use crate::error::{PipelineStage, ReportError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A live engine session that callers can keep across several runs.
///
/// Cloning the handle shares the same process. The holder is responsible for
/// calling [`SessionHandle::dispose`] once it is done.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<dyn EngineSession>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl SessionHandle {
    pub fn new(inner: Arc<dyn EngineSession>) -> Self {
        Self { inner }
    }

    /// Start a new engine process.
    pub async fn launch(engine: &dyn RenderingEngine, config: &EngineConfig) -> Result<Self> {
        let start = Instant::now();
        let inner = engine
            .launch(config)
            .await
            .map_err(|e| ReportError::EngineStartFailure {
                detail: match e {
                    EngineError::Launch(detail) => detail,
                    other => other.to_string(),
                },
            })?;
        info!(
            "Rendering engine ready in {}ms",
            start.elapsed().as_millis()
        );
        Ok(Self { inner })
    }

    /// Open an independent context on this session.
    pub async fn open_context(&self) -> std::result::Result<Box<dyn EngineContext>, EngineError> {
        if self.inner.is_disposed() {
            return Err(EngineError::Disposed);
        }
        self.inner.open_context().await
    }

    /// Terminate the engine process. Calling it again is a no-op.
    pub async fn dispose(&self) -> Result<()> {
        self.inner.dispose().await.map_err(|e| match e {
            EngineError::Disposed => ReportError::SessionDisposed,
            other => ReportError::internal(
                PipelineStage::Output,
                format!("engine dispose failed: {other}"),
            ),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

/// Who is responsible for disposing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Started by this run; disposed by it.
    Owned,
    /// Supplied by the caller; never disposed by the run.
    Borrowed,
}

/// A session held for the duration of one run.
#[derive(Debug)]
pub struct SessionLease {
    handle: SessionHandle,
    ownership: Ownership,
}

impl SessionLease {
    /// Borrow `existing` when given, otherwise start an owned session.
    ///
    /// A borrowed session that has already been disposed is rejected here,
    /// before any work is scheduled on it.
    pub async fn acquire(
        engine: &dyn RenderingEngine,
        config: &EngineConfig,
        existing: Option<&SessionHandle>,
    ) -> Result<Self> {
        match existing {
            Some(handle) => {
                if handle.is_disposed() {
                    return Err(ReportError::SessionDisposed);
                }
                debug!("Reusing caller-supplied rendering session");
                Ok(Self {
                    handle: handle.clone(),
                    ownership: Ownership::Borrowed,
                })
            }
            None => Ok(Self {
                handle: SessionHandle::launch(engine, config).await?,
                ownership: Ownership::Owned,
            }),
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// End the lease: dispose an owned session, leave a borrowed one alone.
    ///
    /// Dispose failures are logged, not returned; the run's own result is
    /// what the caller needs to see.
    pub async fn release(self) {
        if self.ownership == Ownership::Borrowed {
            return;
        }
        if let Err(e) = self.handle.dispose().await {
            warn!("Failed to dispose rendering session: {}", e);
        }
    }
}
