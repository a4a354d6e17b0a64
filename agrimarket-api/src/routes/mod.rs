/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration, login and user profiles
/// - `sellers`: Seller-only endpoints

pub mod health;
pub mod sellers;
pub mod users;
