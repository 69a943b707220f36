pub mod card;
pub mod draft;
pub mod engine;
pub mod fetcher;
pub mod state;
