//! Report generation: which reports exist, how their scripts are run and how
//! the latest output of each is found in the report directory.

mod catalog;
mod credentials;
mod error;
mod invoker;
mod report_type;

pub use catalog::{format_last_modified, ReportCatalog, ReportRecord};
pub use credentials::{CredentialResolver, CredentialSettings, Credentials};
pub use error::{ConfigError, ReportError, ScriptError, ScriptErrorKind};
pub use invoker::{ReportService, ReportSettings};
pub use report_type::{ReportStrategy, ReportType, StrategyKind};
