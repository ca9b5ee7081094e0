pub mod clock;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
