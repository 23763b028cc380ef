pub mod community;
pub mod competitor;
pub mod news;

pub use community::CommunityWorker;
pub use competitor::CompetitorWorker;
pub use news::NewsWorker;
