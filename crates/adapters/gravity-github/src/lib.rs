pub mod config;
pub mod fallback;
pub mod listing;

pub use config::RepoListingConfig;
pub use listing::{ListingSource, RepoLister, RepoListing, Repository, filter_by_topics};
