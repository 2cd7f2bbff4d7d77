use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Device identifiers as they appear in link text, e.g. `iPhone12,1` or `AppleTV5,3`.
regex!(DEVICE_REGEX, r"^(?:iPhone|AppleTV|iPad|iPod)[0-9]+,[0-9]+");
// `[[target]]` or `[[target|text]]`; the text may carry single-bracket markup.
regex!(WIKILINK_REGEX, r"\[\[([^\[\]|]*)(?:\|((?:[^\[\]]|\[[^\[\]]*\])*))?\]\]");
// Bracketed `[url label]` first, bare URLs second.
regex!(
    EXTERNAL_LINK_REGEX,
    r#"\[((?:https?:)?//[^\s\[\]<>"]+)(?:[ \t]+([^\]\n]*))?\]|(https?://[^\s\[\]<>"{}|]+)"#
);
regex!(SPAN_REGEX, r#"(?i)\b(rowspan|colspan)\s*=\s*["']?\s*(\d+)"#);

/// Separator between per-device entries in the build cell's template markup.
pub(crate) const BUILDID_SEPARATOR: &str = "   | ";
/// Separator between a build template parameter's name and its value.
pub(crate) const BUILDID_ASSIGNMENT: &str = " = ";
pub(crate) const IPSW_SUFFIX: &str = ".ipsw";
/// Numbers at or below this are footnote markers, not file sizes.
pub(crate) const MIN_SIZE_TOKEN: u64 = 10;

/// Page titles for a whole major release end in e.g. `14.x`.
pub(crate) const VERSION_RANGE_MARKER: &str = ".x";
/// First major version with IPSW beta firmwares on the wiki.
pub const DEFAULT_MIN_MAJOR_VERSION: u32 = 9;
/// tvOS beta firmwares were distributed as IPSWs from version 7 onwards.
pub const APPLE_TV_MIN_MAJOR_VERSION: u32 = 7;
pub const APPLE_TV_FAMILY: &str = "Apple TV";

// Wikitext spans are clamped the same way MediaWiki clamps them.
pub(crate) const MAX_COLSPAN: usize = 1000;
pub(crate) const MAX_ROWSPAN: usize = 65534;
