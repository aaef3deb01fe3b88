pub mod config;
pub mod emergency;
pub mod errors;
pub mod ids;
pub mod labels;
pub mod phase;
pub mod provider;
pub mod session;
pub mod turns;

pub use config::{Config, CredentialConfig};
pub use emergency::{EmergencyKind, Severity};
pub use errors::ProviderError;
pub use ids::{EmergencyLogId, ReportId, SessionId};
pub use labels::{CaseLabels, LabelField};
pub use phase::Phase;
pub use provider::{GenerateRequest, Generation, TextModel};
pub use session::SessionContext;
pub use turns::{ChatTurn, Role};
