// Tool usage: PRO/FREE monthly limits, Redis counters, activity charts.

pub mod charts;
pub mod handlers;
pub mod limits;
pub mod tracker;
