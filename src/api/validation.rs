//! Input validation for API requests.
//!
//! Validators return `Result<(), String>` with a user-facing message; use
//! `ValidationErrorBuilder` from the `error` module to collect several of
//! them into one `ApiError`.
//!
//! Oversized title, category and URL values are truncated rather than
//! rejected. Cover images are the exception: a value that is still too long
//! after upload processing is a client error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{MAX_CATEGORY_LEN, MAX_COVER_IMAGE_LEN, MAX_SITE_URL_LEN, MAX_TITLE_LEN};

lazy_static! {
    /// Loose email shape: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 255;

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

pub fn truncate_title(title: &str) -> String {
    truncate_chars(title, MAX_TITLE_LEN)
}

pub fn truncate_category(category: &str) -> String {
    truncate_chars(category, MAX_CATEGORY_LEN)
}

pub fn truncate_site_url(site_url: &str) -> String {
    truncate_chars(site_url, MAX_SITE_URL_LEN)
}

pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

/// Description must be present and not blank
pub fn validate_description(description: Option<&str>) -> Result<(), String> {
    match description {
        Some(d) if !d.trim().is_empty() => Ok(()),
        _ => Err("description is required in the request body".to_string()),
    }
}

/// A cover image that survives processing must be a short hosted URL (or empty).
pub fn validate_cover_image(cover_image: &str) -> Result<(), String> {
    if cover_image.chars().count() > MAX_COVER_IMAGE_LEN {
        return Err(
            "coverImage too long. Please upload the image via the upload endpoint or send an externally-hosted URL."
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("Email is too long (max {} characters)", MAX_EMAIL_LEN));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username is too long (max {} characters)",
            MAX_USERNAME_LEN
        ));
    }
    Ok(())
}

/// Multipart uploads: only `image/*` content types
pub fn validate_image_content_type(content_type: &str) -> Result<(), String> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err("Only image files are allowed!".to_string())
    }
}

pub fn validate_image_size(size: usize, max_bytes: usize) -> Result<(), String> {
    if size > max_bytes {
        return Err(format!(
            "File too large. Maximum size is {}MB.",
            max_bytes / (1024 * 1024)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("", 3), "");
        // multi-byte characters count once
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let long = "x".repeat(MAX_TITLE_LEN + 50);
        let once = truncate_title(&long);
        assert_eq!(once.chars().count(), MAX_TITLE_LEN);
        assert_eq!(truncate_title(&once), once);

        assert_eq!(truncate_category(&"c".repeat(80)).len(), MAX_CATEGORY_LEN);
        assert_eq!(truncate_site_url(&"u".repeat(900)).len(), MAX_SITE_URL_LEN);
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description(Some("A site")).is_ok());
        assert!(validate_description(Some("   ")).is_err());
        assert!(validate_description(None).is_err());
    }

    #[test]
    fn test_validate_cover_image() {
        assert!(validate_cover_image("").is_ok());
        assert!(validate_cover_image("https://example.com/a.png").is_ok());
        assert!(validate_cover_image(&"a".repeat(MAX_COVER_IMAGE_LEN)).is_ok());
        assert!(validate_cover_image(&"a".repeat(MAX_COVER_IMAGE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("a lice@example.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("  ").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_image_upload() {
        assert!(validate_image_content_type("image/png").is_ok());
        assert_eq!(
            validate_image_content_type("application/pdf").unwrap_err(),
            "Only image files are allowed!"
        );

        let max = 5 * 1024 * 1024;
        assert!(validate_image_size(max, max).is_ok());
        assert_eq!(
            validate_image_size(max + 1, max).unwrap_err(),
            "File too large. Maximum size is 5MB."
        );
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("x", "Title").is_ok());
        assert_eq!(validate_required(" ", "Title").unwrap_err(), "Title is required");
    }
}
