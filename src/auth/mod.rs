pub mod client_secret;
pub mod oauth;
pub mod token_manager;
pub mod token_store;

pub use token_manager::{AuthorizedClient, get_client};
pub use token_store::{FileTokenStore, MemoryTokenStore, StoredToken, TokenStore};
