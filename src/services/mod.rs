pub mod file_parser_service;
pub mod normalizer_service;
pub mod schema_mapper_service;
pub mod channel_homologation_service;
pub mod sku_reconciler_service;
pub mod import_wizard_service;
pub mod commit_service;

pub use commit_service::CommitService;
pub use file_parser_service::SpreadsheetReader;
pub use import_wizard_service::WizardStore;
pub use schema_mapper_service::RecordBuilder;
