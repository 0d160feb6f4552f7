#![forbid(unsafe_code)]

pub mod model;
pub mod session_clock;
pub mod time;

pub use session_clock::{ClockExpired, SessionClock};
pub use time::Clock;
