pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod window;

// Re-export commonly used types
pub use config::{Config, WorkspaceSettings};
pub use error::WorkspaceError;
pub use query::{FilterEntry, Node, ParseError, apply_query, compile, is_in_query, parse};
pub use window::{AddOutcome, Arrangement, UrlQuery, UrlState, Viewport, WindowDescriptor, WindowRegistry};
