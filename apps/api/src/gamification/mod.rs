pub mod achievements;
pub mod handlers;
pub mod ledger;
pub mod levels;
pub mod points;
pub mod rankings;
pub mod rewards;
