pub mod models;
pub mod parsing;
pub mod validation;

pub use models::{DeliveryOutcome, OutcomeStatus, Recipient, RunSummary, TemplateRef, UploadedAsset};
pub use parsing::{load_recipients, RecipientList, RecipientLoadError, SkippedRow};
