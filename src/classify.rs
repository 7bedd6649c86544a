//! Media-type classification for captured bodies.
//!
//! Decides whether a body is worth rendering as text at all, and if so which
//! structured shape it resembles. Everything here is a pure function over a
//! parsed [`MediaType`]; the rendering pipeline picks a formatter based on the
//! resulting [`ContentKind`].

use std::fmt;

const FORM_SUBTYPE: &str = "x-www-form-urlencoded";

/// Parsed `Content-Type` descriptor: primary type, full subtype (structured
/// suffixes like `+json` are kept), and the declared charset if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub charset: Option<String>,
}

impl MediaType {
    /// Parse a `Content-Type` header value. Returns `None` for values the
    /// `mime` grammar rejects; callers treat that the same as no header.
    pub fn parse(header: &str) -> Option<Self> {
        let mime: mime::Mime = header.trim().parse().ok()?;
        let subtype = match mime.suffix() {
            Some(suffix) => format!("{}+{}", mime.subtype(), suffix),
            None => mime.subtype().as_str().to_string(),
        };
        Some(Self {
            type_: mime.type_().as_str().to_string(),
            subtype,
            charset: mime
                .get_param(mime::CHARSET)
                .map(|c| c.as_str().to_string()),
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

/// Structured shape of a loggable body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    Html,
    Form,
    Plain,
    /// Primary type `text` with an unrecognized subtype.
    Text,
    /// Not loggable text.
    None,
}

/// Whether a body with this declared media type can be rendered as text.
///
/// Absent type information means "no": truly untyped content goes through the
/// byte-sampling heuristic instead (see `format::probably_binary`).
pub fn is_loggable(media_type: Option<&MediaType>) -> bool {
    let Some(mt) = media_type else {
        return false;
    };
    if mt.type_.eq_ignore_ascii_case("text") {
        return true;
    }
    let subtype = mt.subtype.to_ascii_lowercase();
    subtype.contains("plain")
        || subtype.contains("json")
        || subtype.contains("xml")
        || subtype.contains("html")
        || subtype == FORM_SUBTYPE
}

/// Classify a media type by the same substring rules as [`is_loggable`].
/// JSON and XML are checked before the generic `text/*` case so that
/// `text/json` or `application/svg+xml` pick up the structured formatter.
pub fn classify(media_type: Option<&MediaType>) -> ContentKind {
    let Some(mt) = media_type else {
        return ContentKind::None;
    };
    let subtype = mt.subtype.to_ascii_lowercase();
    if subtype.contains("json") {
        ContentKind::Json
    } else if subtype.contains("xml") {
        ContentKind::Xml
    } else if subtype.contains("html") {
        ContentKind::Html
    } else if subtype == FORM_SUBTYPE {
        ContentKind::Form
    } else if subtype.contains("plain") {
        ContentKind::Plain
    } else if mt.type_.eq_ignore_ascii_case("text") {
        ContentKind::Text
    } else {
        ContentKind::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(header: &str) -> MediaType {
        MediaType::parse(header).unwrap()
    }

    #[test]
    fn parses_type_subtype_and_charset() {
        let m = mt("application/json; charset=utf-8");
        assert_eq!(m.type_, "application");
        assert_eq!(m.subtype, "json");
        assert_eq!(m.charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn keeps_structured_suffix() {
        assert_eq!(mt("image/svg+xml").subtype, "svg+xml");
        assert_eq!(mt("application/problem+json").subtype, "problem+json");
    }

    #[test]
    fn rejects_garbage_header() {
        assert!(MediaType::parse("not a media type at all ///").is_none());
    }

    #[test]
    fn text_primary_type_is_loggable() {
        assert!(is_loggable(Some(&mt("text/csv"))));
        assert!(is_loggable(Some(&mt("text/plain"))));
    }

    #[test]
    fn structured_subtypes_are_loggable() {
        assert!(is_loggable(Some(&mt("application/json"))));
        assert!(is_loggable(Some(&mt("application/problem+json"))));
        assert!(is_loggable(Some(&mt("image/svg+xml"))));
        assert!(is_loggable(Some(&mt("application/xhtml+xml"))));
        assert!(is_loggable(Some(&mt("application/x-www-form-urlencoded"))));
    }

    #[test]
    fn binary_types_are_not_loggable() {
        assert!(!is_loggable(Some(&mt("image/png"))));
        assert!(!is_loggable(Some(&mt("application/octet-stream"))));
        assert!(!is_loggable(None));
    }

    #[test]
    fn classification_prefers_structured_kinds() {
        assert_eq!(classify(Some(&mt("application/json"))), ContentKind::Json);
        assert_eq!(classify(Some(&mt("text/json"))), ContentKind::Json);
        assert_eq!(classify(Some(&mt("image/svg+xml"))), ContentKind::Xml);
        assert_eq!(classify(Some(&mt("text/html"))), ContentKind::Html);
        assert_eq!(
            classify(Some(&mt("application/x-www-form-urlencoded"))),
            ContentKind::Form
        );
        assert_eq!(classify(Some(&mt("text/plain"))), ContentKind::Plain);
        assert_eq!(classify(Some(&mt("text/csv"))), ContentKind::Text);
        assert_eq!(
            classify(Some(&mt("application/octet-stream"))),
            ContentKind::None
        );
        assert_eq!(classify(None), ContentKind::None);
    }
}
