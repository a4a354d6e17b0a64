/// Seller endpoints
///
/// Mounted behind the token layer and the seller role guard, so handlers can
/// assume a resolved seller.

use agrimarket_shared::{auth::middleware::CurrentUser, models::user::User};
use axum::Json;

/// Returns the authenticated seller's profile
///
/// ```text
/// GET /sellers/me
/// Authorization: Bearer <token>
/// ```
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
