pub mod leaderboard;
pub mod ledger;
pub mod players;
