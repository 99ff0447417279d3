pub mod config;
pub mod error;
pub mod filter;
pub mod ha;
pub mod registry;
pub mod rename;
pub mod snapshot;
pub mod sync;

pub use config::Config;
pub use config::LogLevel;
pub use error::ConnectionError;
pub use error::Error;
pub use error::ErrorKind;
pub use registry::ActionableRecord;
pub use rename::RenameOutcome;
pub use rename::RenameReport;
pub use snapshot::RenameMapping;
