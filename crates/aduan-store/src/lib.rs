pub mod database;
pub mod emergency;
pub mod error;
pub mod hashing;
pub mod reports;
pub mod row_helpers;
pub mod schema;

pub use database::Database;
pub use emergency::{EmergencyRepo, EmergencyRow};
pub use error::StoreError;
pub use hashing::SessionHasher;
pub use reports::{ReportRepo, ReportRow, ReportStatus};
