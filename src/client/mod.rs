//! Client side of the directory: typed API client, session state, the site
//! store with its derived filtered view, and keystroke debouncing.

mod api_client;
mod context;
mod debounce;
mod session;
mod store;

pub use api_client::{ApiClient, ClientError, ImageFile};
pub use context::ClientContext;
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use session::Session;
pub use store::{derive_categories, filter_sites, SiteStore};
