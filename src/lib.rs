// proposal-pdf: workshop proposal wizard with paginated PDF export

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod preview;
pub mod record;
pub mod render;
pub mod session;
pub mod store;
pub mod wizard;

pub use config::AppConfig;
pub use error::{AppError, CacheError, SaveError, StoreError};
pub use export::{flatten, DocumentExporter, ExportSettings, ExportedDocument};
pub use layout::{Layout, LayoutEngine, OverflowPolicy, PageGeometry, Section};
pub use record::Record;
pub use session::{SaveOutcome, Session, View};
pub use store::{LocalStore, RecordStore, StoredRecord, Subscription};
pub use wizard::{AdvancePolicy, Step, TextField, Wizard};
