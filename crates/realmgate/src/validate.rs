//! Input rules for account and character requests.
//!
//! Lengths count characters, not bytes.

use realmgate_protocol::{StatusCode, ATTRIBUTE_COUNT};

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MAX_USERNAME_LENGTH: usize = 16;
pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_PASSWORD_LENGTH: usize = 25;
pub const MIN_CHARACTER_NAME_LENGTH: usize = 4;
pub const MAX_CHARACTER_NAME_LENGTH: usize = 25;

pub const MAX_HAIR_STYLE: u8 = 7;
pub const MAX_HAIR_COLOR: u8 = 11;
pub const MAX_GENDER: u8 = 1;

/// Attribute points a level-1 character distributes, all of them.
pub const ATTRIBUTE_POINTS_AT_LEVEL_1: u32 = 60;

/// Names, emails, and passwords end up in quoted contexts downstream.
pub fn has_double_quotes(s: &str) -> bool {
    s.contains('"')
}

fn length_within(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.chars().count())
}

pub fn is_valid_username(name: &str) -> bool {
    !has_double_quotes(name) && length_within(name, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH)
}

pub fn is_valid_password(password: &str) -> bool {
    !has_double_quotes(password)
        && length_within(password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
}

pub fn is_valid_character_name(name: &str) -> bool {
    !has_double_quotes(name)
        && length_within(name, MIN_CHARACTER_NAME_LENGTH, MAX_CHARACTER_NAME_LENGTH)
}

/// Exactly one `@`, something before it, and a dotted domain after it
/// whose labels are non-empty.
pub fn is_valid_email(email: &str) -> bool {
    if has_double_quotes(email) || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Checks hair style, hair color, then gender.
pub fn check_appearance(hair_style: u8, hair_color: u8, gender: u8) -> Result<(), StatusCode> {
    if hair_style > MAX_HAIR_STYLE {
        return Err(StatusCode::InvalidHairStyle);
    }
    if hair_color > MAX_HAIR_COLOR {
        return Err(StatusCode::InvalidHairColor);
    }
    if gender > MAX_GENDER {
        return Err(StatusCode::InvalidGender);
    }
    Ok(())
}

/// The total must be exactly [`ATTRIBUTE_POINTS_AT_LEVEL_1`] and no single
/// attribute may be zero. The total is checked first.
pub fn check_attributes(attributes: &[u16; ATTRIBUTE_COUNT]) -> Result<(), StatusCode> {
    let total: u32 = attributes.iter().map(|&a| u32::from(a)).sum();
    if total > ATTRIBUTE_POINTS_AT_LEVEL_1 {
        return Err(StatusCode::AttributesTooHigh);
    }
    if total < ATTRIBUTE_POINTS_AT_LEVEL_1 {
        return Err(StatusCode::AttributesTooLow);
    }
    if attributes.contains(&0) {
        return Err(StatusCode::AttributeZero);
    }
    Ok(())
}
