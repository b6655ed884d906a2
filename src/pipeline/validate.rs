//! File validation: type and size checks before any network call.

use crate::config::ValidationRules;
use crate::document::UploadedDocument;
use crate::error::ValidationError;
use tracing::debug;

/// Check an upload against `rules`.
///
/// Media type is checked before size, so an oversized PNG reports the type
/// problem. A missing or zero-byte document is [`ValidationError::MissingFile`].
pub fn validate_document(
    document: Option<&UploadedDocument>,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    let doc = match document {
        Some(d) if !d.content.is_empty() => d,
        _ => return Err(ValidationError::MissingFile),
    };

    let declared = doc.media_type.trim();
    if !rules
        .allowed_media_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(declared))
    {
        return Err(ValidationError::UnsupportedType {
            media_type: doc.media_type.clone(),
        });
    }

    if doc.size() > rules.max_file_size {
        return Err(ValidationError::TooLarge {
            size: doc.size(),
            limit: rules.max_file_size,
        });
    }

    debug!("Validated {} ({} bytes)", doc.file_name, doc.size());
    Ok(())
}
