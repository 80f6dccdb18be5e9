//! URL checks for attributes that navigate or load.

use crate::error::{EditorError, Result};

/// Schemes never written into `href` or `src`.
const REFUSED_SCHEMES: &[&str] = &["javascript", "vbscript", "data"];

/// Trim `url` and refuse empty values and script-capable schemes.
pub fn validate_href(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(EditorError::unsupported("link target is empty"));
    }
    let scheme = url
        .split_once(':')
        .map(|(scheme, _)| scheme.trim().to_ascii_lowercase());
    match scheme {
        Some(scheme) if REFUSED_SCHEMES.contains(&scheme.as_str()) => Err(
            EditorError::unsupported(format!("refusing link target '{url}'")),
        ),
        _ => Ok(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_href() {
        assert_eq!(validate_href("  https://example.org ").unwrap(), "https://example.org");
        assert_eq!(validate_href("/relative?a=b").unwrap(), "/relative?a=b");
        assert_eq!(validate_href("#fn-1").unwrap(), "#fn-1");
        for bad in ["", "   ", "javascript:alert(1)", "JavaScript:x", " vbscript:x", "data:text/html,hi"] {
            assert!(validate_href(bad).is_err(), "{bad:?} accepted");
        }
    }
}
