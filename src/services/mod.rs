pub mod applicator;
pub mod matcher;
pub mod scraper;
pub mod status;

pub use applicator::{FormApplicator, FormSurface};
pub use matcher::{AnswerMatcher, OptionCandidate};
pub use scraper::{CredentialStore, EnvCredentialStore, FormScraper, ScrapeOutcome};
pub use status::{StatusChannel, StatusSink};
