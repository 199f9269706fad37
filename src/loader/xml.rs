//! XML documents.
//!
//! The root element's name is ignored; its content is the top-level table.
//! An element with only text becomes a string. An element with child
//! elements or attributes becomes a table holding its attributes and
//! children, plus its text under `value` when there is any. Sibling
//! elements sharing a name collect into a list.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use roxmltree::{Document, Node};

use crate::error::{ConfigResult, ConfigurationError};
use crate::loader::{read_text, ConfigurationSourceLoader, Encoding};
use crate::source::{ConfigurationSource, TreeSource};
use crate::value::Value;

/// Key holding the text of an element that also has attributes or children.
pub const TEXT_KEY: &str = "value";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlLoader;

impl ConfigurationSourceLoader for XmlLoader {
    fn format(&self) -> &'static str {
        "XML"
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        encoding: Option<Encoding>,
    ) -> ConfigResult<Arc<dyn ConfigurationSource>> {
        let text = read_text(reader, encoding)?;
        let doc = Document::parse(&text).map_err(|e| ConfigurationError::Parse {
            format: self.format(),
            message: e.to_string(),
        })?;
        let root = match element_value(doc.root_element()) {
            table @ Value::Table(_) => table,
            _ => Value::Table(BTreeMap::new()),
        };
        Ok(Arc::new(TreeSource::new(root)))
    }
}

fn element_value(node: Node<'_, '_>) -> Value {
    let text = node
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect::<String>();
    let text = text.trim();

    let mut children = node.children().filter(|child| child.is_element()).peekable();
    if children.peek().is_none() && node.attributes().next().is_none() {
        return Value::String(text.to_string());
    }

    let mut table = BTreeMap::new();
    for attribute in node.attributes() {
        table.insert(
            attribute.name().to_string(),
            Value::String(attribute.value().to_string()),
        );
    }
    for child in children {
        let name = child.tag_name().name().to_string();
        let value = element_value(child);
        match table.remove(&name) {
            None => {
                table.insert(name, value);
            }
            // Elements never convert to lists, so a list here is a repeat.
            Some(Value::List(mut items)) => {
                items.push(value);
                table.insert(name, Value::List(items));
            }
            Some(previous) => {
                table.insert(name, Value::List(vec![previous, value]));
            }
        }
    }
    if !text.is_empty() {
        table
            .entry(TEXT_KEY.to_string())
            .or_insert_with(|| Value::String(text.to_string()));
    }
    Value::Table(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Arc<dyn ConfigurationSource> {
        let mut input = xml.as_bytes();
        XmlLoader.parse(&mut input, None).unwrap()
    }

    #[test]
    fn test_nested_elements_become_tables() {
        let source = parse(
            r#"<?xml version="1.0"?>
            <configuration>
                <server>
                    <timeout>60</timeout>
                    <name> svc </name>
                </server>
                <debug>true</debug>
            </configuration>"#,
        );
        assert_eq!(source.retrieve::<u32>("server.timeout").unwrap(), 60);
        assert_eq!(source.retrieve::<String>("server.name").unwrap(), "svc");
        assert!(source.retrieve::<bool>("debug").unwrap());
        assert!(!source.is_available("configuration"));
    }

    #[test]
    fn test_repeated_elements_become_list() {
        let source = parse(
            "<app><hosts><host>a</host><host>b</host><host>c</host></hosts><single><host>x</host></single></app>",
        );
        assert_eq!(
            source.retrieve::<Vec<String>>("hosts.host").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(
            source.retrieve::<Vec<String>>("single.host").unwrap(),
            vec!["x".to_string()]
        );
    }

    #[test]
    fn test_attributes_and_text_in_table() {
        let source = parse(r#"<app><pool size="8" name="main">primary</pool><empty/></app>"#);
        assert_eq!(source.retrieve::<u32>("pool.size").unwrap(), 8);
        assert_eq!(source.retrieve::<String>("pool.name").unwrap(), "main");
        assert_eq!(source.retrieve::<String>("pool.value").unwrap(), "primary");
        assert_eq!(source.retrieve::<String>("empty").unwrap(), "");
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let mut input: &[u8] = b"<app><timeout>60</app>";
        let err = XmlLoader.parse(&mut input, None).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { format: "XML", .. }));
    }

    #[test]
    fn test_latin1_override() {
        let mut input: &[u8] = b"<app><name>caf\xe9</name></app>";
        let source = XmlLoader.parse(&mut input, Some(Encoding::Latin1)).unwrap();
        assert_eq!(source.retrieve::<String>("name").unwrap(), "café");
    }
}
