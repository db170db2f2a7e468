//! Batch ingestion pipeline for song catalog entries, favorites and ratings.
//!
//! A batch is an array of independently valid or invalid records. Each
//! record is validated ([`normalize`]), its target looked up and the write
//! applied ([`operations`]), all driven in input order by [`BatchDriver`].
//! The result is one [`ItemOutcome`] per input position plus operator-only
//! [`FaultDiagnostic`]s for store failures.

pub mod driver;
pub mod fault_sink;
pub mod normalize;
pub mod operations;
pub mod outcome;

pub use driver::{BatchDriver, BatchOperation, MISSING_SONG};
pub use fault_sink::{FakeFaultSink, FanoutFaultSink, FaultSink, TracingFaultSink};
pub use operations::{
    decode_items, CatalogSongInput, CatalogUpsert, FavoriteMode, FavoriteRefInput,
    FavoriteToggle, RateSongs, RatingInput, SONGS,
};
pub use outcome::{
    BatchReport, DefectKind, FaultDiagnostic, FaultStage, FieldDefect, ItemOutcome, ItemStatus,
    INTERNAL_ERROR,
};
