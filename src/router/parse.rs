//! Route segment classification.
//!
//! Each `/`-delimited segment of a registered path is classified once at
//! insertion time. Composite segments compile to a single anchored regex
//! with named captures; a pattern that fails to compile degrades to a
//! static segment with a logged warning rather than failing registration.

use std::sync::Arc;

use regex::Regex;
use tracing::warn;

/// Discriminator for a route tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text, matched by equality.
    Static,
    /// `{name}` — one segment, bound verbatim.
    Param,
    /// `*` — one segment, nothing bound.
    Wildcard,
    /// `**` or `{name:*}` — the remaining path, including an empty rest.
    CatchAll,
    /// Anything else containing `{…}` — anchored regex with named captures.
    Pattern,
}

pub(crate) struct ParsedSegment {
    pub kind: SegmentKind,
    pub param_name: Option<Arc<str>>,
    pub pattern: Option<Regex>,
    pub capture_keys: Vec<Arc<str>>,
}

impl ParsedSegment {
    pub(crate) fn plain(kind: SegmentKind) -> Self {
        ParsedSegment {
            kind,
            param_name: None,
            pattern: None,
            capture_keys: Vec::new(),
        }
    }

    fn named(kind: SegmentKind, name: &str) -> Self {
        ParsedSegment {
            kind,
            param_name: Some(Arc::from(name)),
            pattern: None,
            capture_keys: Vec::new(),
        }
    }
}

pub(crate) fn parse_segment(seg: &str) -> ParsedSegment {
    if seg == "**" {
        return ParsedSegment::plain(SegmentKind::CatchAll);
    }
    if seg == "*" {
        return ParsedSegment::plain(SegmentKind::Wildcard);
    }
    if !seg.contains('{') && !seg.contains('*') {
        return ParsedSegment::plain(SegmentKind::Static);
    }

    // {name:*} consumes the rest of the path under `name`.
    if let Some(name) = seg
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix(":*}"))
    {
        return ParsedSegment::named(SegmentKind::CatchAll, name);
    }

    // {name} with a single brace pair and no spec is a plain parameter.
    if seg.starts_with('{') && seg.ends_with('}') && seg.matches('{').count() == 1 {
        let inner = &seg[1..seg.len() - 1];
        if !inner.contains(':') {
            return ParsedSegment::named(SegmentKind::Param, inner);
        }
    }

    compile_pattern(seg)
}

/// Compile a composite segment like `{file}.{ext}` or `v{ver:[0-9]+}-api`
/// into one anchored regex. Literal stretches are escaped; brace groups
/// become named captures, defaulting to `[^/]+`.
fn compile_pattern(seg: &str) -> ParsedSegment {
    let mut source = String::with_capacity(seg.len() + 8);
    source.push('^');
    let mut keys: Vec<Arc<str>> = Vec::new();

    let bytes = seg.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        let Some(open) = seg[idx..].find('{').map(|i| i + idx) else {
            source.push_str(&regex::escape(&seg[idx..]));
            break;
        };
        source.push_str(&regex::escape(&seg[idx..open]));

        let mut close = None;
        let mut balance = 1;
        for (offset, b) in bytes[open + 1..].iter().enumerate() {
            match b {
                b'{' => balance += 1,
                b'}' => {
                    balance -= 1;
                    if balance == 0 {
                        close = Some(open + 1 + offset);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            // Unbalanced brace: the remainder is literal text.
            source.push_str(&regex::escape(&seg[open..]));
            break;
        };

        let content = &seg[open + 1..close];
        let (name, pattern) = match content.find(':') {
            Some(colon) => (&content[..colon], &content[colon + 1..]),
            None => (content, "[^/]+"),
        };
        source.push_str(&format!("(?P<{name}>{pattern})"));
        keys.push(Arc::from(name));
        idx = close + 1;
    }
    source.push('$');

    match Regex::new(&source) {
        Ok(re) => ParsedSegment {
            kind: SegmentKind::Pattern,
            param_name: None,
            pattern: Some(re),
            capture_keys: keys,
        },
        Err(err) => {
            warn!(segment = seg, error = %err, "invalid route pattern, treating segment as static");
            ParsedSegment::plain(SegmentKind::Static)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_wildcards() {
        assert_eq!(parse_segment("users").kind, SegmentKind::Static);
        assert_eq!(parse_segment("*").kind, SegmentKind::Wildcard);
        assert_eq!(parse_segment("**").kind, SegmentKind::CatchAll);
    }

    #[test]
    fn test_named_param() {
        let seg = parse_segment("{id}");
        assert_eq!(seg.kind, SegmentKind::Param);
        assert_eq!(seg.param_name.as_deref(), Some("id"));
    }

    #[test]
    fn test_named_catch_all() {
        let seg = parse_segment("{filepath:*}");
        assert_eq!(seg.kind, SegmentKind::CatchAll);
        assert_eq!(seg.param_name.as_deref(), Some("filepath"));
    }

    #[test]
    fn test_composite_compiles() {
        let seg = parse_segment("{name}.{ext}");
        assert_eq!(seg.kind, SegmentKind::Pattern);
        let re = seg.pattern.unwrap();
        let caps = re.captures("photo.jpg").unwrap();
        assert_eq!(&caps["name"], "photo");
        assert_eq!(&caps["ext"], "jpg");
        assert_eq!(seg.capture_keys.len(), 2);
    }

    #[test]
    fn test_regex_spec() {
        let seg = parse_segment("v{ver:[0-9]+}-api");
        assert_eq!(seg.kind, SegmentKind::Pattern);
        let re = seg.pattern.unwrap();
        assert!(re.is_match("v12-api"));
        assert!(!re.is_match("vx-api"));
        assert!(!re.is_match("v12-api-extra"));
    }

    #[test]
    fn test_literal_dots_escaped() {
        let seg = parse_segment("{name}.tar.gz");
        let re = seg.pattern.unwrap();
        assert!(re.is_match("backup.tar.gz"));
        assert!(!re.is_match("backupxtarxgz"));
    }

    #[test]
    fn test_invalid_pattern_falls_back_to_static() {
        let seg = parse_segment("{bad:[}");
        assert_eq!(seg.kind, SegmentKind::Static);
        assert!(seg.pattern.is_none());
    }

    #[test]
    fn test_unbalanced_brace_is_literal() {
        let seg = parse_segment("{open.txt");
        assert_eq!(seg.kind, SegmentKind::Pattern);
        let re = seg.pattern.unwrap();
        assert!(re.is_match("{open.txt"));
    }
}
