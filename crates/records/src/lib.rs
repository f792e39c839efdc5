//! Record domain: the `records` collection and its endpoints.
//!
//! Exposed through `RecordsModule`:
//! - `createRecord` (HTTP POST) and `callCreateRecord` (callable)
//! - `getRecord` / `listRecords` (HTTP GET)
//! - `recordSetIncrementId` (on-create trigger stamping `increment_id`)

pub mod assemblers;
pub mod handlers;
pub mod module;
pub mod record;
pub mod repository;
pub mod service;
pub mod validators;

pub use assemblers::{CreateRecordRequest, GetRecordRequest, ListRecordsRequest};
pub use handlers::{CreateRecordHandler, GetRecordHandler, ListRecordsHandler};
pub use module::RecordsModule;
pub use record::{Record, RecordPatch};
pub use repository::{RECORDS_COLLECTION, RecordRepository, record_repository};
pub use service::RecordService;
