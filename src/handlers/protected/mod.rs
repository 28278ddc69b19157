// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects the AuthUser extension
pub mod stories;
