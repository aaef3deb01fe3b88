pub mod client;
pub mod extract;
pub mod history;
pub mod prompts;
pub mod provider;
pub mod quota;

pub mod mock;

pub use client::{ClientConfig, FailoverClient, Reply, ReplySource};
pub use provider::GeminiProvider;
pub use quota::{CredentialKind, FileQuotaStore, QuotaLedger};
