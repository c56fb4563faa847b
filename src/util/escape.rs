use std::borrow::Cow;

/// Escapes text for use in XML character data or attribute values.
///
/// Replaces `&`, `<`, `>`, `"` and `'` with their predefined entities.
/// Absent input is treated as the empty string. Every occurrence is replaced,
/// and `&` is handled in the same pass as the other characters, so entities
/// produced here are never escaped a second time.
///
/// Returns `Cow::Borrowed` when nothing needed escaping.
///
/// # Examples
///
/// ```
/// use storefeed::util::escape_xml;
///
/// assert_eq!(escape_xml(Some("Fish & Chips")), "Fish &amp; Chips");
/// assert_eq!(escape_xml(Some("<b>")), "&lt;b&gt;");
/// assert_eq!(escape_xml(None), "");
/// ```
pub fn escape_xml(text: Option<&str>) -> Cow<'_, str> {
    match text {
        Some(s) => quick_xml::escape::escape(s),
        None => Cow::Borrowed(""),
    }
}
