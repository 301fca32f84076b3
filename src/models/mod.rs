pub mod ai;
pub mod card;
pub mod leaderboard;
pub mod period;
pub mod settings;
pub mod technician;
pub mod template;
