pub mod envelope;
pub mod record;
pub mod search;
pub mod site;

pub use envelope::{Body, Diagnostic, Envelope};
pub use record::{Details, Person, Record};
pub use search::SearchResult;
pub use site::{Site, UnknownSite};
