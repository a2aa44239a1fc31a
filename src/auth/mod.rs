pub mod broadcast;
pub mod session;
pub mod state;
pub mod token;
pub mod types;

pub use broadcast::{AuthChannel, BusChannel, StorageWatcher, Subscription};
pub use session::AuthSession;
pub use state::{AuthState, HeadlessNavigator, Navigator};
pub use token::{AccessToken, AccessTokenHolder};
pub use types::{AuthBroadcastMessage, StoredUser};
