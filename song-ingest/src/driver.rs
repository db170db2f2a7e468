//! Batch driver: validate → resolve → persist, one item at a time.
//!
//! Items run strictly in input order and item `i + 1` starts only once the
//! outcome of item `i` is recorded, so `outcomes[i]` always belongs to
//! `inputs[i]`. Nothing an item does can abort the batch; a store fault
//! becomes a generic failed outcome plus a [`FaultDiagnostic`].

use async_trait::async_trait;
use song_store::{SongStore, StoreError, StoreResult};
use tracing::{debug, info};
use uuid::Uuid;

use crate::outcome::{
    BatchReport, FaultDiagnostic, FaultStage, FieldDefect, ItemOutcome, INTERNAL_ERROR,
};

/// Message for an item whose referenced song is not stored.
pub const MISSING_SONG: &str = "song id does not exist";

// ------------------------------------------------------------------ //
//  Operation seam                                                     //
// ------------------------------------------------------------------ //

/// One kind of batch (catalog upsert, favorite toggle, rating).
#[async_trait]
pub trait BatchOperation: Send + Sync {
    /// Raw record as decoded at the HTTP boundary.
    type Input: Send + Sync;
    /// Record after validation and normalisation.
    type Record: Send + Sync;
    /// Stored entity the record refers to.
    type Target: Send;

    /// Name used in logs and fault diagnostics.
    fn name(&self) -> &'static str;

    /// Pure check of one record. Never touches the store.
    fn validate(&self, index: usize, input: &Self::Input)
        -> Result<Self::Record, Vec<FieldDefect>>;

    /// Exactly one read at most. `Ok(None)` means the target is absent.
    async fn resolve(
        &self,
        store: &dyn SongStore,
        record: &Self::Record,
    ) -> StoreResult<Option<Self::Target>>;

    /// Exactly one idempotent write (or no-op).
    async fn persist(
        &self,
        store: &dyn SongStore,
        record: Self::Record,
        target: Self::Target,
    ) -> StoreResult<()>;

    fn missing_target_message(&self) -> &'static str {
        MISSING_SONG
    }
}

// ------------------------------------------------------------------ //
//  Driver                                                             //
// ------------------------------------------------------------------ //

pub struct BatchDriver<'s> {
    store: &'s dyn SongStore,
}

impl<'s> BatchDriver<'s> {
    pub fn new(store: &'s dyn SongStore) -> Self {
        Self { store }
    }

    /// Run `op` over every input. Returns once the last position is done.
    pub async fn run<O: BatchOperation>(&self, op: &O, inputs: &[O::Input]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let mut outcomes = Vec::with_capacity(inputs.len());
        let mut faults = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let outcome = match self.process(op, index, input).await {
                Ok(outcome) => outcome,
                Err((stage, e)) => {
                    debug!(%batch_id, operation = op.name(), index, %stage, "store fault");
                    faults.push(FaultDiagnostic {
                        batch_id,
                        operation: op.name().to_string(),
                        index,
                        stage,
                        detail: e.to_string(),
                    });
                    ItemOutcome::failed(INTERNAL_ERROR)
                }
            };
            outcomes.push(outcome);
        }

        let report = BatchReport {
            batch_id,
            outcomes,
            faults,
        };
        info!(
            %batch_id,
            operation = op.name(),
            items = inputs.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            faults = report.faults.len(),
            "batch complete"
        );
        report
    }

    async fn process<O: BatchOperation>(
        &self,
        op: &O,
        index: usize,
        input: &O::Input,
    ) -> Result<ItemOutcome, (FaultStage, StoreError)> {
        let record = match op.validate(index, input) {
            Ok(record) => record,
            Err(defects) => {
                debug!(operation = op.name(), index, defects = defects.len(), "item rejected");
                return Ok(ItemOutcome::invalid(defects));
            }
        };

        let target = match op.resolve(self.store, &record).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!(operation = op.name(), index, "target absent");
                return Ok(ItemOutcome::failed(op.missing_target_message()));
            }
            Err(e) => return Err((FaultStage::Resolve, e)),
        };

        op.persist(self.store, record, target)
            .await
            .map(|()| ItemOutcome::succeeded())
            .map_err(|e| (FaultStage::Persist, e))
    }
}
