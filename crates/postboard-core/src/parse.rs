//! Text-to-record parser.
//!
//! Announcements are loose `Key: value` lines. Parsing is a pure function of
//! the [`RawEvent`]: no I/O, no logging. Callers decide what to do with a
//! [`ParseError`].

use std::collections::HashMap;

use crate::error::{ParseError, Result};
use crate::record::{normalize_tag, RawEvent, Record};
use crate::{REQUIRED_FIELDS, TAG_SEPARATORS};

/// Parse a raw event into a validated [`Record`].
///
/// # Errors
///
/// - [`ParseError::MissingField`] for the first of `name`, `type`, `tags`
///   that is absent or blank
/// - [`ParseError::MissingUrl`] when the listener supplied no URL or an
///   empty one. Any other URL is stored verbatim.
/// - [`ParseError::NoValidTags`] when the tags value yields no tokens
///
/// # Example
///
/// ```
/// use postboard_core::{parse, RawEvent};
///
/// let event = RawEvent::new(
///     "Name: Foo\nType: Library\nTags: #go #backend #us",
///     Some("http://x".to_string()),
///     42,
/// );
/// let record = parse(&event)?;
/// assert_eq!(record.tags, ["go", "backend", "us"]);
/// # Ok::<(), postboard_core::ParseError>(())
/// ```
pub fn parse(event: &RawEvent) -> Result<Record> {
    let mut fields = parse_fields(&event.text);

    for key in REQUIRED_FIELDS {
        if fields.get(key).is_none_or(|value| value.trim().is_empty()) {
            return Err(ParseError::MissingField(key.to_string()));
        }
    }

    let url = event.url().ok_or(ParseError::MissingUrl)?.to_string();

    let tags = split_tags(&fields["tags"]);
    if tags.is_empty() {
        return Err(ParseError::NoValidTags);
    }

    // Presence checked above.
    let name = fields.remove("name").unwrap_or_default();
    let r#type = fields.remove("type").unwrap_or_default();

    Ok(Record {
        name,
        r#type,
        tags,
        url,
    })
}

/// Collect `key: value` pairs from free text.
///
/// Keys are lower-cased. Only the first `:` splits a line, so values may
/// contain colons. Lines without a colon, or with a blank key or value, are
/// skipped. A repeated key overwrites the earlier value.
pub fn parse_fields(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim().to_lowercase();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            fields.insert(key, value.to_string());
        }
    }

    fields
}

/// Split a raw tags value into normalized tags.
///
/// The separator is whichever of [`TAG_SEPARATORS`] occurs first in the
/// value, and the whole value is split on that character alone. Mixed
/// separators are not split further: `"a, b; c"` yields `["a", "b; c"]`.
/// Tokens are normalized with [`normalize_tag`] and empty ones dropped.
pub fn split_tags(raw: &str) -> Vec<String> {
    let tokens: Vec<&str> = match raw.chars().find(|c| TAG_SEPARATORS.contains(c)) {
        Some(separator) => raw.split(separator).collect(),
        None => vec![raw],
    };

    tokens
        .into_iter()
        .map(normalize_tag)
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str, url: &str) -> RawEvent {
        RawEvent::new(text, Some(url.to_string()), -100123)
    }

    // =========================================================================
    // parse
    // =========================================================================

    #[test]
    fn test_parse_full_announcement() {
        let record = parse(&event(
            "Name: Foo\nType: Library\nTags: #go #backend #us",
            "http://x",
        ))
        .unwrap();

        assert_eq!(
            record,
            Record {
                name: "Foo".to_string(),
                r#type: "Library".to_string(),
                tags: vec!["go".into(), "backend".into(), "us".into()],
                url: "http://x".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_missing_type() {
        let err = parse(&event("Name: Foo\nTags: a,b", "http://x")).unwrap_err();
        assert_eq!(err, ParseError::MissingField("type".to_string()));
    }

    #[test]
    fn test_parse_reports_first_missing_field() {
        let err = parse(&event("Tags: a", "http://x")).unwrap_err();
        assert_eq!(err, ParseError::MissingField("name".to_string()));

        let err = parse(&event("Name: Foo\nType: Tool", "http://x")).unwrap_err();
        assert_eq!(err, ParseError::MissingField("tags".to_string()));
    }

    #[test]
    fn test_parse_blank_value_counts_as_missing() {
        let err = parse(&event("Name:   \nType: Tool\nTags: a", "http://x")).unwrap_err();
        assert_eq!(err, ParseError::MissingField("name".to_string()));
    }

    #[test]
    fn test_parse_missing_url() {
        let text = "Name: Foo\nType: Library\nTags: go";
        assert_eq!(
            parse(&RawEvent::new(text, None, 1)).unwrap_err(),
            ParseError::MissingUrl
        );
        assert_eq!(parse(&event(text, "")).unwrap_err(), ParseError::MissingUrl);
    }

    #[test]
    fn test_parse_keeps_url_verbatim() {
        let text = "Name: Foo\nType: Library\nTags: go";
        let record = parse(&event(text, " http://x ")).unwrap();
        assert_eq!(record.url, " http://x ");

        let record = parse(&event(text, "   ")).unwrap();
        assert_eq!(record.url, "   ");
    }

    #[test]
    fn test_parse_fields_checked_before_url() {
        let err = parse(&RawEvent::new("Name: Foo", None, 1)).unwrap_err();
        assert_eq!(err, ParseError::MissingField("type".to_string()));
    }

    #[test]
    fn test_parse_no_valid_tags() {
        let err = parse(&event("Name: Foo\nType: Library\nTags: # #", "http://x")).unwrap_err();
        assert_eq!(err, ParseError::NoValidTags);
    }

    #[test]
    fn test_parse_case_insensitive_keys_and_extra_lines() {
        let text = "Check this out!\n\nNAME: Foo Bar\n  type :  CLI  \nTAGS: rust\nStars: 42";
        let record = parse(&event(text, "http://x")).unwrap();
        assert_eq!(record.name, "Foo Bar");
        assert_eq!(record.r#type, "CLI");
        assert_eq!(record.tags, ["rust"]);
    }

    #[test]
    fn test_parse_crlf_lines() {
        let record = parse(&event("Name: Foo\r\nType: Tool\r\nTags: a b\r\n", "http://x")).unwrap();
        assert_eq!(record.r#type, "Tool");
        assert_eq!(record.tags, ["a", "b"]);
    }

    #[test]
    fn test_parse_url_comes_from_event_not_text() {
        let text = "Name: Foo\nType: Tool\nTags: a\nURL: http://from-text";
        let record = parse(&event(text, "http://from-event")).unwrap();
        assert_eq!(record.url, "http://from-event");
    }

    // =========================================================================
    // parse_fields
    // =========================================================================

    #[test]
    fn test_parse_fields_last_wins() {
        let fields = parse_fields("Name: First\nName: Second");
        assert_eq!(fields["name"], "Second");
    }

    #[test]
    fn test_parse_fields_blank_duplicate_keeps_earlier() {
        let fields = parse_fields("Name: First\nName:   ");
        assert_eq!(fields["name"], "First");
    }

    #[test]
    fn test_parse_fields_splits_on_first_colon_only() {
        let fields = parse_fields("Name: Foo: The Sequel\nLink: https://example.com");
        assert_eq!(fields["name"], "Foo: The Sequel");
        assert_eq!(fields["link"], "https://example.com");
    }

    #[test]
    fn test_parse_fields_ignores_lines_without_colon_or_key() {
        let fields = parse_fields("just text\n: orphan value\nType: Tool");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["type"], "Tool");
    }

    // =========================================================================
    // split_tags
    // =========================================================================

    #[test]
    fn test_split_tags_first_separator_in_value() {
        assert_eq!(split_tags("x; y; z"), ["x", "y", "z"]);
    }

    #[test]
    fn test_split_tags_each_separator() {
        assert_eq!(split_tags("a b"), ["a", "b"]);
        assert_eq!(split_tags("a,b"), ["a", "b"]);
        assert_eq!(split_tags("a;b"), ["a", "b"]);
        assert_eq!(split_tags("a|b"), ["a", "b"]);
    }

    #[test]
    fn test_split_tags_mixed_separators_not_split_further() {
        assert_eq!(split_tags("a, b; c"), ["a", "b; c"]);
        assert_eq!(split_tags("a|b c"), ["a", "b c"]);
    }

    #[test]
    fn test_split_tags_single_tag() {
        assert_eq!(split_tags("#solo"), ["solo"]);
    }

    #[test]
    fn test_split_tags_drops_empty_tokens_keeps_duplicates() {
        assert_eq!(split_tags("#go  #go ,"), ["go", "go", ","]);
        assert_eq!(split_tags("go,,#,rust"), ["go", "rust"]);
    }

    #[test]
    fn test_split_tags_renormalization_is_stable() {
        let once = split_tags("#go, # backend ,#us");
        let twice: Vec<String> = once.iter().map(|t| normalize_tag(t)).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_split_tags_earliest_separator_wins_over_list_order() {
        // Comma appears before the space, so the space stays inside a tag.
        assert_eq!(split_tags("a,b c"), ["a", "b c"]);
        assert_eq!(split_tags("a b,c"), ["a", "b,c"]);
    }

    // =========================================================================
    // properties
    // =========================================================================

    use proptest::prelude::*;

    fn separator() -> impl Strategy<Value = char> {
        prop::sample::select(TAG_SEPARATORS.to_vec())
    }

    fn tag_token() -> impl Strategy<Value = (bool, String)> {
        (any::<bool>(), "[a-z0-9][a-z0-9_.-]{0,8}")
    }

    proptest! {
        #[test]
        fn test_required_fields_round_trip(
            name in "[A-Za-z0-9]([A-Za-z0-9 ._-]{0,18}[A-Za-z0-9])?",
            kind in "[A-Za-z]{1,12}",
            tokens in prop::collection::vec(tag_token(), 1..6),
            sep in separator(),
            upper_keys in any::<bool>(),
            url in "https?://[a-z]{1,10}\\.[a-z]{2,3}(/[a-z0-9]{0,6})?",
        ) {
            let key = |k: &str| if upper_keys { k.to_uppercase() } else { k.to_string() };
            let raw_tags = tokens
                .iter()
                .map(|(hash, tag)| if *hash { format!("#{tag}") } else { tag.clone() })
                .collect::<Vec<_>>()
                .join(&sep.to_string());
            let text = format!(
                "{}: {name}\n{}: {kind}\n{}: {raw_tags}",
                key("Name"),
                key("Type"),
                key("Tags"),
            );

            let record = parse(&RawEvent::new(text, Some(url.clone()), 1)).unwrap();

            let expected: Vec<String> = tokens.into_iter().map(|(_, tag)| tag).collect();
            prop_assert_eq!(record.name, name);
            prop_assert_eq!(record.r#type, kind);
            prop_assert_eq!(record.tags, expected);
            prop_assert_eq!(record.url, url);
        }

        #[test]
        fn test_split_tags_output_is_normalized(
            tokens in prop::collection::vec("#?[a-z0-9 ]{0,6}", 0..8),
            sep in separator(),
        ) {
            let raw = tokens.join(&sep.to_string());

            for tag in split_tags(&raw) {
                prop_assert!(!tag.is_empty());
                prop_assert!(!tag.starts_with('#'));
                prop_assert_eq!(normalize_tag(&tag), tag.clone());
            }
        }
    }
}
