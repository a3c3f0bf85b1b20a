pub mod domain;
pub mod memory;
pub mod ports;
pub mod sessions;
pub mod statistics;

pub use domain::{AuthSession, Book, NewBook, ReadingSession, User, UserCredentials, UserProfile};
pub use memory::InMemoryStore;
pub use ports::{PortError, PortResult, TrackerStore};
pub use sessions::{BookView, SessionTracker};
pub use statistics::StatisticsAggregator;
