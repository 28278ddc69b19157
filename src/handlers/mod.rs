// handlers/mod.rs - two security tiers
//
// Public (no auth): service info, health
// Protected (bearer token): story CRUD under /api
pub mod protected;
pub mod public;
