//! Command implementations.

pub mod ask;
pub mod convert;
pub mod ingest;
pub mod search;
pub mod sources;

pub use self::ask::{execute_ask, stream_text};
pub use self::convert::execute_convert;
pub use self::ingest::execute_ingest;
pub use self::search::execute_search;
pub use self::sources::{execute_clear, execute_sources};
