//! Renders a [`FeedDocument`] as a Google Shopping RSS 2.0 document.
use std::fmt::Write;

use super::types::{FeedDocument, FeedItem};
use crate::util::escape_xml;

/// Namespace of the `g:` product elements.
pub const GOOGLE_NAMESPACE: &str = "http://base.google.com/ns/1.0";

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Also emit `<g:sale_price>`, mirroring `<g:price>`.
    pub emit_sale_price: bool,
}

/// Renders the feed with default options.
///
/// Never fails: absent optional values render as empty text. Titles and
/// descriptions go into CDATA sections unescaped; every other value is
/// entity-escaped. Item blocks appear in input order.
///
/// # Examples
///
/// ```
/// use storefeed::feed::{serialize, FeedDocument, Shop};
///
/// let doc = FeedDocument {
///     shop: Shop { name: "Acme".into(), url: "https://acme.com".into(), description: None },
///     items: vec![],
/// };
/// let xml = serialize(&doc);
/// assert!(xml.contains("<description>Acme</description>"));
/// assert!(!xml.contains("<item>"));
/// ```
pub fn serialize(doc: &FeedDocument) -> String {
    render_feed(doc, RenderOptions::default())
}

pub fn render_feed(doc: &FeedDocument, options: RenderOptions) -> String {
    let shop = &doc.shop;
    let mut out = String::with_capacity(256 + doc.items.len() * 512);

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(out, "<rss version=\"2.0\" xmlns:g=\"{}\">", GOOGLE_NAMESPACE);
    out.push_str("<channel>\n");
    let _ = writeln!(out, "  <title>{}</title>", escape_xml(Some(&shop.name)));
    let _ = writeln!(out, "  <link>{}</link>", escape_xml(Some(&shop.url)));
    let _ = writeln!(
        out,
        "  <description>{}</description>",
        escape_xml(Some(shop.description_or_name()))
    );

    // Item blocks are joined by single newlines; with no items the section
    // is an empty line
    for (i, item) in doc.items.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_item(&mut out, item, options);
    }

    out.push_str("\n</channel>\n</rss>");
    out
}

fn render_item(out: &mut String, item: &FeedItem, options: RenderOptions) {
    out.push_str("  <item>\n");
    let _ = writeln!(out, "    <g:id>{}</g:id>", escape_xml(Some(&item.id)));
    let _ = writeln!(out, "    <g:title>{}</g:title>", cdata(&item.title));
    let _ = writeln!(
        out,
        "    <g:description>{}</g:description>",
        cdata(item.description.as_deref().unwrap_or_default())
    );
    let _ = writeln!(out, "    <g:link>{}</g:link>", escape_xml(Some(&item.link)));
    let _ = writeln!(
        out,
        "    <g:image_link>{}</g:image_link>",
        escape_xml(Some(&item.image_link))
    );
    let _ = writeln!(
        out,
        "    <g:availability>{}</g:availability>",
        escape_xml(Some(&item.availability))
    );
    if let Some((amount, currency)) = item.price_parts() {
        let price = format!("{} {}", escape_xml(Some(amount)), escape_xml(Some(currency)));
        let _ = writeln!(out, "    <g:price>{}</g:price>", price);
        if options.emit_sale_price {
            let _ = writeln!(out, "    <g:sale_price>{}</g:sale_price>", price);
        }
    }
    out.push_str("  </item>");
}

/// Wraps text in a CDATA section.
///
/// A `]]>` inside the text would close the section early, so it is split
/// across two sections; the character data read back is unchanged.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{Price, Shop};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    fn shop() -> Shop {
        Shop {
            name: "Acme".into(),
            url: "https://acme.com".into(),
            description: None,
        }
    }

    fn item(id: &str, title: &str) -> FeedItem {
        FeedItem {
            id: id.into(),
            title: title.into(),
            description: None,
            link: format!("https://acme.com/{}", id),
            image_link: format!("https://acme.com/{}.jpg", id),
            availability: "in stock".into(),
            price: Some(Price {
                amount: Some("9.99".into()),
                currency: Some("USD".into()),
            }),
        }
    }

    /// Reads the document back and collects the text of every `<g:id>`.
    /// Panics if the document is not well-formed.
    fn read_ids(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut ids = Vec::new();
        let mut in_id = false;
        loop {
            match reader.read_event().expect("well-formed XML") {
                Event::Start(e) if e.name().as_ref() == b"g:id" => in_id = true,
                Event::End(e) if e.name().as_ref() == b"g:id" => in_id = false,
                Event::Text(t) if in_id => ids.push(t.unescape().unwrap().into_owned()),
                Event::Eof => break,
                _ => {}
            }
        }
        ids
    }

    #[test]
    fn test_exact_document() {
        let doc = FeedDocument {
            shop: shop(),
            items: vec![item("1", "Sock <Blue>")],
        };
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:g="http://base.google.com/ns/1.0">
<channel>
  <title>Acme</title>
  <link>https://acme.com</link>
  <description>Acme</description>
  <item>
    <g:id>1</g:id>
    <g:title><![CDATA[Sock <Blue>]]></g:title>
    <g:description><![CDATA[]]></g:description>
    <g:link>https://acme.com/1</g:link>
    <g:image_link>https://acme.com/1.jpg</g:image_link>
    <g:availability>in stock</g:availability>
    <g:price>9.99 USD</g:price>
  </item>
</channel>
</rss>"#;
        assert_eq!(serialize(&doc), expected);
    }

    #[test]
    fn test_empty_items() {
        let doc = FeedDocument {
            shop: shop(),
            items: vec![],
        };
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:g="http://base.google.com/ns/1.0">
<channel>
  <title>Acme</title>
  <link>https://acme.com</link>
  <description>Acme</description>

</channel>
</rss>"#;
        let xml = serialize(&doc);
        assert_eq!(xml, expected);
        assert!(read_ids(&xml).is_empty());
    }

    #[test]
    fn test_items_joined_by_single_newline() {
        let doc = FeedDocument {
            shop: shop(),
            items: vec![item("1", "A"), item("2", "B")],
        };
        let xml = serialize(&doc);
        assert!(xml.contains("  </item>\n  <item>\n"));
        assert_eq!(read_ids(&xml), vec!["1", "2"]);
    }

    #[test]
    fn test_channel_fields_escaped() {
        let doc = FeedDocument {
            shop: Shop {
                name: "Fish & Chips <Co>".into(),
                url: "https://fish.example/?a=1&b=2".into(),
                description: Some("\"Best\" in 'town'".into()),
            },
            items: vec![],
        };
        let xml = serialize(&doc);
        assert!(xml.contains("<title>Fish &amp; Chips &lt;Co&gt;</title>"));
        assert!(xml.contains("<link>https://fish.example/?a=1&amp;b=2</link>"));
        assert!(xml.contains("<description>&quot;Best&quot; in &apos;town&apos;</description>"));
    }

    #[test]
    fn test_item_fields_escaped_except_cdata() {
        let mut it = item("a&b", "<b>Bold</b> & more");
        it.description = Some("<p>Rich</p>".into());
        it.link = "https://acme.com/p?x=1&y=2".into();
        let xml = serialize(&FeedDocument {
            shop: shop(),
            items: vec![it],
        });
        assert!(xml.contains("<g:id>a&amp;b</g:id>"));
        assert!(xml.contains("<g:title><![CDATA[<b>Bold</b> & more]]></g:title>"));
        assert!(xml.contains("<g:description><![CDATA[<p>Rich</p>]]></g:description>"));
        assert!(xml.contains("<g:link>https://acme.com/p?x=1&amp;y=2</g:link>"));
    }

    #[test]
    fn test_price_parts_escaped() {
        let mut it = item("1", "A");
        it.price = Some(Price {
            amount: Some("<1>".into()),
            currency: Some("U&D".into()),
        });
        let xml = serialize(&FeedDocument {
            shop: shop(),
            items: vec![it],
        });
        assert!(xml.contains("<g:price>&lt;1&gt; U&amp;D</g:price>"));
    }

    #[test]
    fn test_incomplete_price_omitted() {
        let mut it = item("1", "A");
        it.price = Some(Price {
            amount: Some("5".into()),
            currency: None,
        });
        let mut no_price = item("2", "B");
        no_price.price = None;
        let xml = serialize(&FeedDocument {
            shop: shop(),
            items: vec![it, no_price],
        });
        assert!(!xml.contains("<g:price>"));
        assert!(xml.contains("<g:availability>in stock</g:availability>\n  </item>"));
    }

    #[test]
    fn test_sale_price_opt_in() {
        let doc = FeedDocument {
            shop: shop(),
            items: vec![item("1", "A")],
        };
        assert!(!serialize(&doc).contains("g:sale_price"));

        let xml = render_feed(
            &doc,
            RenderOptions {
                emit_sale_price: true,
            },
        );
        assert!(xml.contains(
            "    <g:price>9.99 USD</g:price>\n    <g:sale_price>9.99 USD</g:sale_price>\n  </item>"
        ));
    }

    #[test]
    fn test_cdata_terminator_split() {
        let it = item("1", "a]]>b");
        let xml = serialize(&FeedDocument {
            shop: shop(),
            items: vec![it],
        });
        assert!(xml.contains("<g:title><![CDATA[a]]]]><![CDATA[>b]]></g:title>"));
        // Still well-formed
        assert_eq!(read_ids(&xml), vec!["1"]);
    }

    #[test]
    fn test_description_fallback_when_empty() {
        let doc = FeedDocument {
            shop: Shop {
                description: Some(String::new()),
                ..shop()
            },
            items: vec![],
        };
        assert!(serialize(&doc).contains("<description>Acme</description>"));
    }

    #[test]
    fn test_falsy_descriptions_and_script_numbers() {
        let page = "<script>window.borderfreeFeed = {shop: {name: 'Acme', url: 'https://acme.com', description: 0}, \
                    items: [{id: 1e21, title: 'T', description: false, price: {amount: 1e-7, currency: 'USD'}}, {id: -0.0}]};</script>";
        let doc = crate::feed::extract(page).unwrap();
        let xml = serialize(&doc);

        assert!(xml.contains("<description>Acme</description>"));
        assert!(xml.contains("<g:description><![CDATA[]]></g:description>"));
        assert!(xml.contains("<g:id>1e+21</g:id>"));
        assert!(xml.contains("<g:price>1e-7 USD</g:price>"));
        assert!(xml.contains("<g:id>0</g:id>"));
    }

    proptest! {
        #[test]
        fn test_item_count_and_order(ids in prop::collection::vec("[a-z0-9&<>'\"]{1,8}", 0..20)) {
            let doc = FeedDocument {
                shop: shop(),
                items: ids.iter().map(|id| item(id, "t")).collect(),
            };
            let xml = serialize(&doc);
            prop_assert_eq!(xml.matches("<item>").count(), ids.len());
            prop_assert_eq!(read_ids(&xml), ids);
        }

        #[test]
        fn test_special_chars_only_inside_cdata(
            name in "\\PC{0,20}",
            title in "\\PC{0,20}",
            link in "\\PC{0,20}",
        ) {
            let mut it = item("1", &title);
            it.link = link;
            let doc = FeedDocument {
                shop: Shop { name, ..shop() },
                items: vec![it],
            };
            let xml = serialize(&doc);

            // Strip markup and CDATA sections, then no raw specials may remain
            let mut reader = Reader::from_str(&xml);
            loop {
                let event = reader.read_event();
                prop_assert!(event.is_ok(), "not well-formed: {:?}", event.as_ref().err());
                match event.unwrap() {
                    Event::Text(t) => {
                        let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                        prop_assert!(!raw.contains('<') && !raw.contains('>'));
                        prop_assert!(!raw.contains('"') && !raw.contains('\''));
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
        }
    }
}
