//! FaultSink trait and implementations.
//!
//! Store faults collected by a batch are handed to a sink once the batch is
//! done. Sinks are operator-facing only; nothing here reaches the client.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use song_store::PgSongStore;
use tracing::error;

use crate::outcome::FaultDiagnostic;

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

#[async_trait]
pub trait FaultSink: Send + Sync {
    async fn record(&self, faults: &[FaultDiagnostic]) -> Result<()>;
}

// ------------------------------------------------------------------ //
//  TracingFaultSink                                                   //
// ------------------------------------------------------------------ //

/// Emits one `error!` event per fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

#[async_trait]
impl FaultSink for TracingFaultSink {
    async fn record(&self, faults: &[FaultDiagnostic]) -> Result<()> {
        for f in faults {
            error!(
                batch_id = %f.batch_id,
                operation = %f.operation,
                index = f.index,
                stage = %f.stage,
                detail = %f.detail,
                "store fault while processing batch item"
            );
        }
        Ok(())
    }
}

// ------------------------------------------------------------------ //
//  PostgreSQL request log                                             //
// ------------------------------------------------------------------ //

#[async_trait]
impl FaultSink for PgSongStore {
    async fn record(&self, faults: &[FaultDiagnostic]) -> Result<()> {
        for f in faults {
            self.insert_request_log(f.batch_id, &f.operation, f.index, f.stage.as_str(), &f.detail)
                .await?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------ //
//  FanoutFaultSink                                                    //
// ------------------------------------------------------------------ //

/// Forwards to every inner sink; the first error is returned after all
/// sinks have been tried.
#[derive(Clone, Default)]
pub struct FanoutFaultSink {
    sinks: Vec<Arc<dyn FaultSink>>,
}

impl FanoutFaultSink {
    pub fn new(sinks: Vec<Arc<dyn FaultSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl FaultSink for FanoutFaultSink {
    async fn record(&self, faults: &[FaultDiagnostic]) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(faults).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

// ------------------------------------------------------------------ //
//  FakeFaultSink (for tests)                                          //
// ------------------------------------------------------------------ //

/// In-memory sink that collects diagnostics for test assertions.
#[derive(Debug, Default, Clone)]
pub struct FakeFaultSink {
    faults: Arc<Mutex<Vec<FaultDiagnostic>>>,
}

impl FakeFaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-destructive snapshot of currently collected diagnostics.
    pub fn snapshot(&self) -> Vec<FaultDiagnostic> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FaultSink for FakeFaultSink {
    async fn record(&self, faults: &[FaultDiagnostic]) -> Result<()> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(faults);
        Ok(())
    }
}
