// Authentication module
// Credential persistence, refresh, and interactive authorization

mod credentials;
mod flow;
mod manager;
mod pkce;
mod refresh;
mod store;
mod types;

pub use credentials::load_client_secrets;
pub use flow::{AuthFlowError, Authorizer, InstalledAppFlow};
pub use manager::CredentialManager;
pub use refresh::{OAuthRefresher, TokenRefresher};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use types::{ClientSecrets, Credential, TokenResponse, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};
