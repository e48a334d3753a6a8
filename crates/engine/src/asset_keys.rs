use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key must not start with '/'")]
    LeadingSlash,
    #[error("asset key must not contain '..'")]
    ParentTraversal,
    #[error("asset key must not carry a file extension ('.' found)")]
    Extension,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Asset keys name files under an asset directory without their extension,
/// e.g. `tilemap-characters_packed` or `sfx/jump`.
pub(crate) fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(AssetKeyError::LeadingSlash);
    }
    if key.contains("..") {
        return Err(AssetKeyError::ParentTraversal);
    }
    if key.contains('.') {
        return Err(AssetKeyError::Extension);
    }
    let allowed =
        |ch: &char| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-');
    match key.chars().find(|ch| !allowed(ch)) {
        Some(character) => Err(AssetKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_shipped_keys() {
        for key in ["tilemap_packed", "tilemap-characters_packed", "font1", "sfx/jump"] {
            assert!(validate_asset_key(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_paths_and_extensions() {
        assert_eq!(validate_asset_key(""), Err(AssetKeyError::Empty));
        assert_eq!(validate_asset_key("/abs"), Err(AssetKeyError::LeadingSlash));
        assert_eq!(validate_asset_key("a/../b"), Err(AssetKeyError::ParentTraversal));
        assert_eq!(validate_asset_key("font1.png"), Err(AssetKeyError::Extension));
        assert_eq!(
            validate_asset_key("Font"),
            Err(AssetKeyError::InvalidCharacter { character: 'F' })
        );
        assert_eq!(
            validate_asset_key(r"a\b"),
            Err(AssetKeyError::InvalidCharacter { character: '\\' })
        );
    }
}
