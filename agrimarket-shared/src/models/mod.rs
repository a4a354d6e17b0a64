/// Data models
///
/// - `user`: marketplace accounts and the [`user::Role`] enum

pub mod user;
