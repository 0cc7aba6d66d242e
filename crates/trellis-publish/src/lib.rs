// crates/trellis-publish/src/lib.rs
//
// trellis-publish: Background publication of own identities and the fetch
// path that imports other identities' documents.

pub mod fetcher;
pub mod scheduler;
pub mod shutdown;
pub mod state;

pub use fetcher::Fetcher;
pub use scheduler::{CycleReport, PublicationScheduler, PublishSchedule};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use state::InsertState;
