use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use url::Url;

use super::types::{Action, FeedEnvelope, FeedError, FeedRecord};

/// Public identifier of the appliance feed DTD.
pub const PUBLIC_ID: &str = "-//Google//DTD GSA Feeds//EN";

/// Root element name of a feed document.
pub const ROOT_ELEMENT: &str = "gsafeed";

/// Serializes a feed envelope as a GSA feed XML document.
///
/// The document references the DTD at `dtd_url` as its system identifier and
/// contains one `<record>` per envelope record inside a single `<group>`.
/// For [`Action::Delete`] every record carries `action="delete"`; for
/// [`Action::Add`] the attribute is omitted.
///
/// An envelope without records yields an empty `<group/>`. Pushed as a
/// `full` feed, that removes every document of the data source.
///
/// # Errors
///
/// Returns [`FeedError::Xml`] if the writer fails, which only happens on
/// allocation failure for an in-memory buffer.
pub fn build_feed(
    envelope: &FeedEnvelope,
    action: Action,
    dtd_url: &Url,
) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    // Url serialization percent-encodes quotes, so the system id cannot
    // terminate the literal early.
    let doctype = format!(
        r#"{} PUBLIC "{}" "{}""#,
        ROOT_ELEMENT,
        PUBLIC_ID,
        dtd_url.as_str()
    );
    write(&mut writer, Event::DocType(BytesText::from_escaped(doctype)))?;

    write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;

    // <header><datasource/><feedtype/></header>
    write(&mut writer, Event::Start(BytesStart::new("header")))?;
    write_text_element(&mut writer, "datasource", envelope.data_source())?;
    write_text_element(&mut writer, "feedtype", envelope.feed_type().as_str())?;
    write(&mut writer, Event::End(BytesEnd::new("header")))?;

    if envelope.records().is_empty() {
        write(&mut writer, Event::Empty(BytesStart::new("group")))?;
    } else {
        write(&mut writer, Event::Start(BytesStart::new("group")))?;
        for record in envelope.records() {
            let last_modified = record.last_modified_attr();
            let mut element = BytesStart::new("record");
            element.push_attribute(("url", record.url.as_str()));
            element.push_attribute(("displayurl", record.display_url.as_str()));
            if let Some(value) = action.attribute() {
                element.push_attribute(("action", value));
            }
            element.push_attribute(("mimetype", FeedRecord::MIME_TYPE));
            element.push_attribute(("crawl-immediately", FeedRecord::CRAWL_IMMEDIATELY));
            element.push_attribute(("authmethod", FeedRecord::AUTH_METHOD));
            element.push_attribute(("last-modified", last_modified.as_str()));
            write(&mut writer, Event::Empty(element))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("group")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|_| FeedError::InvalidUtf8)
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), FeedError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|e| FeedError::Xml(e.to_string()))
}
