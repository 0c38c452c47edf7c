//! Tags of the YAML 1.1 type repository and their `!!` shorthands.

use std::borrow::Cow;

pub(crate) const LONG_TAG_PREFIX: &str = "tag:yaml.org,2002:";

pub(crate) const TAG_NULL: &str = "tag:yaml.org,2002:null";
pub(crate) const TAG_BOOL: &str = "tag:yaml.org,2002:bool";
pub(crate) const TAG_STR: &str = "tag:yaml.org,2002:str";
pub(crate) const TAG_INT: &str = "tag:yaml.org,2002:int";
pub(crate) const TAG_FLOAT: &str = "tag:yaml.org,2002:float";
pub(crate) const TAG_TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
pub(crate) const TAG_SEQ: &str = "tag:yaml.org,2002:seq";
pub(crate) const TAG_MAP: &str = "tag:yaml.org,2002:map";
pub(crate) const TAG_BINARY: &str = "tag:yaml.org,2002:binary";
pub(crate) const TAG_MERGE: &str = "tag:yaml.org,2002:merge";

/// Tags the resolver may refine from the literal. Everything else passes through untouched.
pub(crate) const RESOLVABLE_TAGS: &[&str] = &[
    "",
    TAG_STR,
    TAG_BOOL,
    TAG_INT,
    TAG_FLOAT,
    TAG_NULL,
    TAG_TIMESTAMP,
];

pub(crate) fn is_resolvable(tag: &str) -> bool {
    RESOLVABLE_TAGS.contains(&tag)
}

/// `tag:yaml.org,2002:int` becomes `!!int`; other tags are returned as they are.
pub(crate) fn short_tag(tag: &str) -> Cow<'_, str> {
    match tag.strip_prefix(LONG_TAG_PREFIX) {
        Some(rest) => Cow::Owned(format!("!!{rest}")),
        None => Cow::Borrowed(tag),
    }
}

/// `!!int` becomes `tag:yaml.org,2002:int`; other tags are returned as they are.
pub(crate) fn long_tag(tag: &str) -> Cow<'_, str> {
    match tag.strip_prefix("!!") {
        Some(rest) => Cow::Owned(format!("{LONG_TAG_PREFIX}{rest}")),
        None => Cow::Borrowed(tag),
    }
}

pub(crate) fn is_null_tag(tag: &str) -> bool {
    tag == TAG_NULL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_forms() {
        assert_eq!(short_tag(TAG_INT), "!!int");
        assert_eq!(short_tag("!local"), "!local");
        assert_eq!(long_tag("!!binary"), TAG_BINARY);
        assert_eq!(long_tag("tag:x"), "tag:x");
        assert!(is_resolvable(""));
        assert!(!is_resolvable(TAG_BINARY));
        assert!(is_null_tag(&long_tag("!!null")));
    }
}
