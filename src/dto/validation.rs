//! Validation helpers for DTOs and path parameters.

use validator::ValidationError;

/// Longest accepted player name, in characters.
pub const MAX_PLAYER_NAME_LEN: usize = 32;
/// Longest accepted enemy identifier.
pub const MAX_ENEMY_ID_LEN: usize = 32;

/// Validates a player name: 1 to 32 characters made of letters, digits, spaces, `_`, `-` or `.`.
///
/// Leading or trailing whitespace is rejected so the name can be used verbatim as a key.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Ayla the Bold") // Ok
/// validate_player_name(" ayla")         // Err - padded
/// validate_player_name("ayla/../x")     // Err - forbidden character
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_PLAYER_NAME_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be 1 to {MAX_PLAYER_NAME_LEN} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if name.trim() != name {
        let mut err = ValidationError::new("player_name_padding");
        err.message = Some("Player name must not start or end with whitespace".into());
        return Err(err);
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
    {
        let mut err = ValidationError::new("player_name_format");
        err.message = Some(
            "Player name may only contain letters, digits, spaces, '_', '-' or '.'".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates an enemy slug: 1 to 32 lowercase ASCII letters, digits, `-` or `_`.
pub fn validate_enemy_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_ENEMY_ID_LEN {
        let mut err = ValidationError::new("enemy_id_length");
        err.message = Some(
            format!("Enemy id must be 1 to {MAX_ENEMY_ID_LEN} characters (got {})", id.len())
                .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_'))
    {
        let mut err = ValidationError::new("enemy_id_format");
        err.message =
            Some("Enemy id may only contain lowercase letters, digits, '-' or '_'".into());
        return Err(err);
    }

    Ok(())
}
