//! HTML stripping for request input.
//!
//! Query values and path segments are stripped of markup before they reach the
//! key builder, so `<b>portal</b>` and `portal` address the same entry.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::caching::RawParams;

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is a valid regex"))
}

/// Remove every HTML tag from `input`.
pub fn strip_html(input: &str) -> Cow<'_, str> {
    if !input.contains('<') {
        return Cow::Borrowed(input);
    }
    tag_pattern().replace_all(input, "")
}

/// Strip markup from every query parameter value. Parameter names are kept.
pub fn sanitize_params(params: RawParams) -> RawParams {
    params
        .into_iter()
        .map(|(name, value)| {
            let value = strip_html(&value).into_owned();
            (name, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("portal-2"), "portal-2");
        assert_eq!(strip_html("<b>portal</b>"), "portal");
        assert_eq!(strip_html("<script>alert(1)</script>zelda"), "alert(1)zelda");
        assert_eq!(strip_html("a <img src=x\nonerror=y> b"), "a  b");
    }

    #[test]
    fn test_unmatched_angle_bracket_is_kept() {
        assert_eq!(strip_html("1 < 2"), "1 < 2");
    }

    #[test]
    fn test_sanitize_params() {
        let mut params = RawParams::new();
        params.insert("search".to_string(), "<i>witcher</i>".to_string());
        params.insert("page".to_string(), "2".to_string());

        let clean = sanitize_params(params);
        assert_eq!(clean["search"], "witcher");
        assert_eq!(clean["page"], "2");
    }
}
