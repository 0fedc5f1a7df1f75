use crate::error::{AppError, AppResult};
use crate::models::Profile;
use tonic::metadata::MetadataMap;
use uuid::Uuid;

/// Metadata header carrying the caller's profile id, set by the auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extract the caller's profile id from request metadata
///
/// # Returns
/// * `Ok(Uuid)` if the header is present and well formed
/// * `Err(AppError::Unauthorized)` otherwise
pub fn caller_id(metadata: &MetadataMap) -> AppResult<Uuid> {
    let raw = metadata
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("Malformed {} header", USER_ID_HEADER)))?;

    parse_user_id(raw)
}

/// Parse a user id as sent by the gateway
pub fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Unauthorized("Missing user id".to_string()));
    }

    Uuid::parse_str(trimmed)
        .map_err(|e| AppError::Unauthorized(format!("Invalid user id: {}", e)))
}

/// Reject callers whose account has been deactivated
pub fn require_active(profile: &Profile) -> AppResult<()> {
    if !profile.is_active {
        return Err(AppError::Forbidden(format!(
            "Account {} is deactivated",
            profile.id
        )));
    }
    Ok(())
}

/// Only administrators may manage equbs, approve requests and draw winners
pub fn require_admin(profile: &Profile) -> AppResult<()> {
    require_active(profile)?;
    if !profile.is_admin() {
        return Err(AppError::Forbidden(
            "This action requires an administrator".to_string(),
        ));
    }
    Ok(())
}
