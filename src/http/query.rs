//! Query string helpers

use hyper::Uri;

/// First value of a query parameter, form-decoded
///
/// Mirrors the usual web-form semantics: `+` is a space and `%XX` escapes
/// are decoded. A parameter given without a value decodes to an empty string.
pub fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_value() {
        assert_eq!(query_param(&uri("/dl?f=notes.txt"), "f").as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_decoding() {
        assert_eq!(
            query_param(&uri("/dl?f=my+file%20%282%29.txt"), "f").as_deref(),
            Some("my file (2).txt")
        );
        assert_eq!(
            query_param(&uri("/dl?f=..%2F..%2Fetc%2Fpasswd"), "f").as_deref(),
            Some("../../etc/passwd")
        );
    }

    #[test]
    fn test_first_value_wins() {
        assert_eq!(query_param(&uri("/dl?x=1&f=a&f=b"), "f").as_deref(), Some("a"));
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(query_param(&uri("/dl"), "f"), None);
        assert_eq!(query_param(&uri("/dl?g=1"), "f"), None);
        assert_eq!(query_param(&uri("/dl?f="), "f").as_deref(), Some(""));
    }
}
