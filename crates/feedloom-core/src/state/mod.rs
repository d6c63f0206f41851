mod path;
mod store;

pub use path::StatePath;
pub use store::{AppState, FormState, Store, Subscriber, SubscriptionId, UiState};
