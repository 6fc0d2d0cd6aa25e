pub mod fanout;
pub mod standings;

pub use fanout::{FanoutReport, NotificationFanout};
pub use standings::{Standing, StandingsService};
