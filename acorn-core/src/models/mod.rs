pub mod capture;
pub mod record;

pub use capture::{CaptureEntity, InspirationItem, Tweet};
pub use record::{RecordType, VectorRecord, VectorStats};
