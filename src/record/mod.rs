//! Record subsystem
//!
//! Records are explicit ordered column -> value maps. A `TableSchema`
//! validates the keys of incoming records; the classifier splits a batch into
//! inserts and updates by the transient `recStatus` tag.

mod batch;
mod classifier;
mod errors;
#[allow(clippy::module_inception)]
mod record;
mod schema;

pub use batch::Batch;
pub use classifier::{Classified, RecordClassifier};
pub use errors::{RecordError, RecordResult};
pub use record::{Record, RecordStatus, REC_STATUS_FIELD};
pub use schema::{ColumnDef, ForeignKey, TableDescriptor, TableSchema};
