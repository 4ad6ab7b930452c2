//! DMR++ text to [DocumentTree] and back.

use std::io::Write;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::tree::{DocumentTree, NodeId, NodeKind};

/// Parse a DMR++ document. Comments, processing instructions and the XML declaration are dropped.
pub fn parse(text: &str) -> crate::Result<DocumentTree> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut tree: Option<DocumentTree> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    loop {
        match reader.read_event().map_err(crate::Error::xml)? {
            Event::Start(e) => {
                let id = open_element(&mut tree, &stack, &e)?;
                stack.push(id);
            }
            Event::Empty(e) => {
                open_element(&mut tree, &stack, &e)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(crate::Error::xml)?;
                if let (Some(tree), Some(&top)) = (tree.as_mut(), stack.last()) {
                    tree.append_text(top, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(tree), Some(&top)) = (tree.as_mut(), stack.last()) {
                    tree.append_text(top, &String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let tree = tree.ok_or_else(|| crate::Error::general("document has no root element"))?;
    if tree.kind(tree.root()) != NodeKind::Dataset {
        return Err(crate::Error::general(format!(
            "document root is <{}>, expected <Dataset>",
            tree.node(tree.root()).tag()
        )));
    }
    Ok(tree)
}

fn open_element(
    tree: &mut Option<DocumentTree>,
    stack: &[NodeId],
    e: &BytesStart,
) -> crate::Result<NodeId> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let id = if let Some(t) = tree.as_mut() {
        let Some(&parent) = stack.last() else {
            return Err(crate::Error::general(format!(
                "element <{tag}> found after the root element"
            )));
        };
        let id = t.create_element(tag);
        t.append_child(parent, id);
        id
    } else {
        tree.insert(DocumentTree::new(tag)).root()
    };
    let tree = tree
        .as_mut()
        .ok_or_else(|| crate::Error::general("document has no root element"))?;
    for attr in e.attributes() {
        let attr = attr.map_err(crate::Error::xml)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(crate::Error::xml)?;
        tree.push_attr(id, key, value.into_owned());
    }
    Ok(id)
}

/// Serialize with an XML declaration and two-space indentation.
pub fn write<W: Write>(tree: &DocumentTree, sink: W) -> crate::Result<()> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(crate::Error::xml)?;
    write_node(&mut writer, tree, tree.root())
}

pub fn to_string(tree: &DocumentTree) -> crate::Result<String> {
    let mut buf = Vec::new();
    write(tree, &mut buf)?;
    String::from_utf8(buf).map_err(crate::Error::wrap)
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    tree: &DocumentTree,
    id: NodeId,
) -> crate::Result<()> {
    let node = tree.node(id);
    let mut start = BytesStart::new(node.tag());
    for (key, value) in node.attributes() {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    let text = node.text().filter(|t| !t.is_empty());
    if text.is_none() && node.children().is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(crate::Error::xml);
    }
    writer
        .write_event(Event::Start(start))
        .map_err(crate::Error::xml)?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(crate::Error::xml)?;
    }
    for &child in node.children() {
        write_node(writer, tree, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag())))
        .map_err(crate::Error::xml)
}
