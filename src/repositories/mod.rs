pub mod links;
pub mod logs;
pub mod settings;
pub mod sites;

pub use links::{LinkStore, PgLinkStore};
pub use logs::{LogStore, NewLogEntry, PgLogStore};
pub use settings::{PgSettingsStore, SettingsStore};
pub use sites::PgSiteStore;
