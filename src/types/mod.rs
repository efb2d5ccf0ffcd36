// src/types/mod.rs
pub mod experience;
pub mod response;

pub use experience::{
    ClassifiedEntry, DurationConflict, EntryVariant, ParsedInterval, RawExperienceEntry,
    ResolvedEntry, YearMonth,
};
pub use response::{
    Diagnostics, DropReason, EntryDiagnostic, EntryStatus, ExclusionReason, ReconciliationResult,
    Stage, TraceEvent,
};
