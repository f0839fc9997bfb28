//! Client-side gate for image uploads. Violations are reported before any
//! bytes leave the machine; the server re-validates on its own.

use crate::error::ClientError;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// A file must claim an `image/` MIME type and fit in 5 MiB.
pub fn validate_image(mime: &str, len: u64) -> Result<(), ClientError> {
    if !mime.starts_with("image/") {
        return Err(ClientError::Validation(
            "Please select an image file.".to_string(),
        ));
    }

    if len > MAX_IMAGE_BYTES {
        return Err(ClientError::Validation(
            "File size must be less than 5MB.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_IMAGE_BYTES, validate_image};
    use crate::error::ClientError;

    #[test]
    fn test_accepts_image_under_limit() {
        assert!(validate_image("image/png", 1024).is_ok());
        assert!(validate_image("image/jpeg", MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let err = validate_image("image/png", 6 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_image() {
        let err = validate_image("text/plain", 1024).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
