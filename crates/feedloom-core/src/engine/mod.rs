mod clock;
mod update;
mod validate;

pub use clock::{Clock, SystemClock};
pub use update::{PollOutcome, PollSummary, Registration, UpdateEngine};
pub use validate::validate_url;
