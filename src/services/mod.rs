pub mod sync;

pub use sync::{AdapterOutcome, KindOutcome, SyncReport, SyncService};
