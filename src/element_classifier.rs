//! Static classification of HTML element names: which ones are void, which trigger RAWTEXT/RCDATA
//! tokenization, and which are "special" for the purposes of tree construction.
//!
//! The tag name -> classification mapping never changes at runtime, so it's built as a perfect
//! hash map with `phf` rather than a `HashMap` populated at startup -- the same trick
//! `html5loom`'s tokenizer uses for its own static tables.

/// What a start tag with a given name implies about the element it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    /// Whether the element has no content model and self-closes implicitly, e.g. `<br>` or
    /// `<img>`. <https://html.spec.whatwg.org/multipage/syntax.html#void-elements>
    pub void: bool,
    /// Whether the tokenizer should switch to RAWTEXT (`<style>`, `<xmp>`, ...), RCDATA
    /// (`<title>`, `<textarea>`), or a dedicated script-data mode (`<script>`) after this start
    /// tag. `None` means the element is parsed in the normal "data" state.
    pub text_mode: Option<TextMode>,
}

/// The tokenizer content model an element switches into once its start tag is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// `<title>`, `<textarea>` -- character references are still decoded.
    RcData,
    /// `<style>`, `<xmp>`, `<iframe>`, `<noembed>`, `<noframes>` -- raw bytes up to the matching
    /// end tag.
    RawText,
    /// `<script>` -- raw bytes, plus the script-data-escaped sub-states for `<!--` inside.
    ScriptData,
    /// `<plaintext>` -- raw bytes for the rest of the document; there is no way back out.
    PlainText,
}

macro_rules! element_table {
    ($($name:literal => $void:literal, $text_mode:expr),* $(,)?) => {
        static ELEMENTS: phf::Map<&'static [u8], ElementInfo> = phf::phf_map! {
            $($name => ElementInfo { void: $void, text_mode: $text_mode }),*
        };
    };
}

element_table! {
    b"area" => true, None,
    b"base" => true, None,
    b"br" => true, None,
    b"col" => true, None,
    b"embed" => true, None,
    b"hr" => true, None,
    b"img" => true, None,
    b"input" => true, None,
    b"link" => true, None,
    b"meta" => true, None,
    b"param" => true, None,
    b"source" => true, None,
    b"track" => true, None,
    b"wbr" => true, None,
    b"title" => false, Some(TextMode::RcData),
    b"textarea" => false, Some(TextMode::RcData),
    b"style" => false, Some(TextMode::RawText),
    b"xmp" => false, Some(TextMode::RawText),
    b"iframe" => false, Some(TextMode::RawText),
    b"noembed" => false, Some(TextMode::RawText),
    b"noframes" => false, Some(TextMode::RawText),
    b"script" => false, Some(TextMode::ScriptData),
    b"plaintext" => false, Some(TextMode::PlainText),
}

/// Look up the classification for an (ASCII-lowercased) HTML element tag name.
///
/// Names outside the static table (i.e. most of them: `div`, `span`, `p`, ...) are
/// non-void, normal-content-model elements, represented by `None`.
#[must_use]
pub(crate) fn classify(tag_name: &[u8]) -> Option<ElementInfo> {
    ELEMENTS.get(tag_name).copied()
}

/// Whether a tag name is a [void element](https://html.spec.whatwg.org/multipage/syntax.html#void-elements).
#[must_use]
pub(crate) fn is_void(tag_name: &[u8]) -> bool {
    classify(tag_name).map_or(false, |info| info.void)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn br_is_void() {
        assert!(is_void(b"br"));
        assert!(!is_void(b"div"));
    }

    #[test]
    fn textarea_is_rcdata() {
        assert_eq!(classify(b"textarea").unwrap().text_mode, Some(TextMode::RcData));
    }

    #[test]
    fn unknown_tag_has_no_classification() {
        assert_eq!(classify(b"my-custom-element"), None);
    }
}
