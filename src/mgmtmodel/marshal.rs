//! # XML Marshalling
//!
//! Converts attribute values to and from their XML text, and the whole
//! [`ConfigTree`] to and from the configuration document.
//!
//! ## Attribute Fragments
//!
//! Each attribute produces at most one fragment, chosen by its
//! [`ElementStyle`]:
//!
//! ```text
//! Attribute      <connector socket-binding="remoting"/>
//! WrappedScalar  <server-auth value="true"/>
//! JoinedList     <qop value="auth auth-int"/>
//! ```
//!
//! Undefined attributes and empty lists produce nothing and read back as
//! undefined. A defined value is always written, even when it equals the
//! default, so "explicitly set" survives a round trip.
//!
//! ## Document Layout
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <server xmlns="urn:mgmtmodel:1.0">
//!     <subsystem name="remoting">
//!         <connector name="default" socket-binding="remoting">
//!             <sasl>
//!                 <qop value="auth"/>
//!             </sasl>
//!         </connector>
//!     </subsystem>
//! </server>
//! ```
//!
//! Every resource kind has a fixed element name. The `name` attribute carries
//! the address value whenever it differs from the element name. Children are
//! written in registration order of their kinds, instances in address order.
//!
//! Loading validates every resource exactly like an add, but never runs
//! runtime plans.

use crate::attributes::{is_expression, AttributeKind, AttributeSpec, ElementStyle, Value, ValueType};
use crate::error::{MgmtError, Result};
use crate::expression::ExpressionResolver;
use crate::lifecycle::ResourceState;
use crate::model::{Address, ConfigTree, PathElement, ResourceEntry, ResourceModel};
use crate::resources::{ResourceDefinition, ResourceKind, ResourceRegistry};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use tracing::debug;

pub const NAMESPACE: &str = "urn:mgmtmodel:1.0";

const ROOT: &str = "server";
const NAME: &str = "name";
const VALUE: &str = "value";

/// Where a marshalled attribute goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// XML attribute on the owning resource element.
    Attribute { name: &'static str, text: String },
    /// Child element `<name value="text"/>`.
    Element { name: &'static str, text: String },
}

/// XML text of a value. `None` for an empty list.
pub fn format_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) | Value::Expression(s) => Some(s.clone()),
        Value::List(items) if items.is_empty() => None,
        Value::List(items) => Some(items.join(" ")),
    }
}

/// The fragment for one attribute of `model`, if it has any output.
pub fn marshal_attribute(spec: &AttributeSpec, model: &ResourceModel) -> Option<Fragment> {
    let text = format_value(model.get(spec.name)?)?;
    Some(match spec.style {
        ElementStyle::Attribute => Fragment::Attribute {
            name: spec.name,
            text,
        },
        ElementStyle::WrappedScalar | ElementStyle::JoinedList => Fragment::Element {
            name: spec.name,
            text,
        },
    })
}

/// Parse XML text back into a value of `spec`'s shape.
///
/// The result is not validated; that happens when it is stored.
pub fn unmarshal_value(spec: &AttributeSpec, text: &str) -> Result<Value> {
    if spec.kind == AttributeKind::StringList {
        if text.is_empty() {
            return Err(MgmtError::Marshal(format!(
                "'{}' must not have an empty value",
                spec.name
            )));
        }
        let items: Vec<String> = text.split(' ').map(str::to_string).collect();
        if items.iter().any(String::is_empty) {
            return Err(MgmtError::Marshal(format!(
                "'{}' has a blank list element in '{}'",
                spec.name, text
            )));
        }
        return Ok(Value::List(items));
    }
    if spec.allow_expression && is_expression(text) {
        return Ok(Value::Expression(text.to_string()));
    }
    Ok(match spec.value_type {
        ValueType::Boolean if text.eq_ignore_ascii_case("true") => Value::Bool(true),
        ValueType::Boolean if text.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(text.to_string()),
    })
}

fn xml_err(e: impl std::fmt::Display) -> MgmtError {
    MgmtError::Marshal(e.to_string())
}

/// Render the whole tree as a configuration document.
pub fn write_document(tree: &ConfigTree, registry: &ResourceRegistry) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new(ROOT);
    root.push_attribute(("xmlns", NAMESPACE));
    if tree.is_empty() {
        writer.write_event(Event::Empty(root)).map_err(xml_err)?;
    } else {
        writer.write_event(Event::Start(root)).map_err(xml_err)?;
        write_children(&mut writer, tree, registry, &Address::root(), None)?;
        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(xml_err)?;
    }

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
    xml.push('\n');
    debug!(resources = tree.len(), "document written");
    Ok(xml)
}

fn write_children(
    writer: &mut Writer<Vec<u8>>,
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    parent: &Address,
    parent_kind: Option<ResourceKind>,
) -> Result<()> {
    for definition in registry.children_of(parent_kind) {
        for (address, entry) in tree.children(parent) {
            if entry.kind == definition.kind {
                write_resource(writer, tree, registry, definition, address, &entry.model)?;
            }
        }
    }
    Ok(())
}

fn has_children(tree: &ConfigTree, address: &Address) -> bool {
    tree.children(address).next().is_some()
}

fn write_resource(
    writer: &mut Writer<Vec<u8>>,
    tree: &ConfigTree,
    registry: &ResourceRegistry,
    definition: &ResourceDefinition,
    address: &Address,
    model: &ResourceModel,
) -> Result<()> {
    let mut start = BytesStart::new(definition.element);
    if let Some(last) = address.last() {
        if last.value != definition.element {
            start.push_attribute((NAME, last.value.as_str()));
        }
    }

    let mut elements = Vec::new();
    for spec in definition.attributes.list() {
        match marshal_attribute(spec, model) {
            Some(Fragment::Attribute { name, text }) => {
                start.push_attribute((name, text.as_str()));
            }
            Some(Fragment::Element { name, text }) => elements.push((name, text)),
            None => {}
        }
    }

    if elements.is_empty() && !has_children(tree, address) {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    for (name, text) in elements {
        let mut element = BytesStart::new(name);
        element.push_attribute((VALUE, text.as_str()));
        writer.write_event(Event::Empty(element)).map_err(xml_err)?;
    }
    write_children(writer, tree, registry, address, Some(definition.kind))?;
    writer
        .write_event(Event::End(BytesEnd::new(definition.element)))
        .map_err(xml_err)?;
    Ok(())
}

/// Minimal element tree; the document has no text content.
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut element = XmlElement {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Default::default()
        };
        for attr in start.attributes() {
            let attr = attr.map_err(xml_err)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_err)?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_elements(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;
    let mut attach = |stack: &mut Vec<XmlElement>, element: XmlElement| -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => root = Some(element),
            None => return Err(MgmtError::Marshal("more than one root element".into())),
        }
        Ok(())
    };

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MgmtError::Marshal("unbalanced end tag".into()))?;
                attach(&mut stack, element)?;
            }
            Event::Text(_) | Event::CData(_) => {
                return Err(MgmtError::Marshal("unexpected text content".into()));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(MgmtError::Marshal("unexpected end of document".into()));
    }
    root.ok_or_else(|| MgmtError::Marshal("document has no root element".into()))
}

/// Parse and validate a configuration document into a fresh tree.
pub fn read_document(
    xml: &str,
    registry: &ResourceRegistry,
    resolver: &dyn ExpressionResolver,
) -> Result<ConfigTree> {
    let root = parse_elements(xml)?;
    if root.name != ROOT {
        return Err(MgmtError::Marshal(format!(
            "expected <{}>, found <{}>",
            ROOT, root.name
        )));
    }
    for (key, value) in &root.attributes {
        if key != "xmlns" {
            return Err(MgmtError::Marshal(format!(
                "unexpected attribute '{}' on <{}>",
                key, ROOT
            )));
        }
        if value != NAMESPACE {
            return Err(MgmtError::Marshal(format!("unsupported namespace '{}'", value)));
        }
    }

    let mut tree = ConfigTree::new();
    for child in &root.children {
        read_resource(&mut tree, registry, resolver, child, &Address::root(), None)?;
    }
    debug!(resources = tree.len(), "document read");
    Ok(tree)
}

fn read_resource(
    tree: &mut ConfigTree,
    registry: &ResourceRegistry,
    resolver: &dyn ExpressionResolver,
    element: &XmlElement,
    parent: &Address,
    parent_kind: Option<ResourceKind>,
) -> Result<()> {
    let value = element.attribute(NAME).unwrap_or(element.name.as_str());
    let definition = registry
        .children_of(parent_kind)
        .filter(|d| d.element == element.name)
        .find(|d| d.path.matches(&PathElement::new(d.path.key, value)))
        .ok_or_else(|| {
            MgmtError::Marshal(format!(
                "unexpected element <{}> (name '{}') under {}",
                element.name, value, parent
            ))
        })?;
    let address = parent.append(definition.path.key, value);

    let mut values = BTreeMap::new();
    for (key, text) in &element.attributes {
        if key == NAME {
            continue;
        }
        let spec = match definition.attributes.get(key) {
            Ok(spec) if spec.style == ElementStyle::Attribute => spec,
            _ => {
                return Err(MgmtError::Marshal(format!(
                    "unexpected attribute '{}' on {}",
                    key, address
                )))
            }
        };
        values.insert(key.clone(), unmarshal_value(spec, text)?);
    }

    let mut resources = Vec::new();
    for child in &element.children {
        let spec = definition
            .attributes
            .list()
            .iter()
            .find(|s| s.name == child.name && s.style != ElementStyle::Attribute);
        let spec = match spec {
            Some(spec) => spec,
            None => {
                resources.push(child);
                continue;
            }
        };
        let text = match child.attributes.as_slice() {
            [(key, text)] if key == VALUE && child.children.is_empty() => text,
            _ => {
                return Err(MgmtError::Marshal(format!(
                    "<{}> on {} must carry exactly one '{}' attribute",
                    child.name, address, VALUE
                )))
            }
        };
        if values.contains_key(spec.name) {
            return Err(MgmtError::Marshal(format!(
                "<{}> appears more than once on {}",
                child.name, address
            )));
        }
        values.insert(spec.name.to_string(), unmarshal_value(spec, text)?);
    }

    let model = ResourceModel::populate(&definition.attributes, values, resolver)?;
    tree.insert(
        address.clone(),
        ResourceEntry::new(definition.kind, ResourceState::Present, model),
    )?;

    for child in resources {
        read_resource(tree, registry, resolver, child, &address, Some(definition.kind))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::PropertyResolver;
    use crate::resources::{jmx, remoting, sasl};

    fn registry() -> ResourceRegistry {
        ResourceRegistry::standard().unwrap()
    }

    fn sasl_spec(name: &str) -> AttributeSpec {
        let definition = sasl::definition().unwrap();
        definition.attributes.get(name).unwrap().clone()
    }

    fn put(tree: &mut ConfigTree, registry: &ResourceRegistry, address: &str, pairs: &[(&str, Value)]) {
        let address = Address::parse(address).unwrap();
        let definition = registry.resolve(&address).unwrap();
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let model =
            ResourceModel::populate(&definition.attributes, values, &PropertyResolver::default())
                .unwrap();
        tree.insert(
            address,
            ResourceEntry::new(definition.kind, ResourceState::Present, model),
        )
        .unwrap();
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn sample_tree(registry: &ResourceRegistry) -> ConfigTree {
        let mut tree = ConfigTree::new();
        put(&mut tree, registry, "/subsystem=remoting", &[]);
        put(
            &mut tree,
            registry,
            "/subsystem=remoting/connector=default",
            &[(remoting::SOCKET_BINDING, Value::String("remoting".into()))],
        );
        put(
            &mut tree,
            registry,
            "/subsystem=remoting/connector=default/security=sasl",
            &[
                (sasl::INCLUDE_MECHANISMS, list(&["DIGEST-MD5", "PLAIN"])),
                (sasl::QOP, list(&["auth", "auth-int"])),
                (sasl::SERVER_AUTH, Value::Bool(false)),
            ],
        );
        put(&mut tree, registry, "/subsystem=jmx", &[]);
        put(
            &mut tree,
            registry,
            "/subsystem=jmx/remoting-connector=jmx",
            &[(jmx::USE_MANAGEMENT_ENDPOINT, Value::Bool(false))],
        );
        put(
            &mut tree,
            registry,
            "/subsystem=jmx/expose-model=resolved",
            &[],
        );
        tree
    }

    fn snapshot(tree: &ConfigTree) -> Vec<(String, ResourceKind, ResourceModel)> {
        tree.iter()
            .map(|(a, e)| (a.to_string(), e.kind, e.model.clone()))
            .collect()
    }

    #[test]
    fn joined_list_uses_single_spaces() {
        let spec = sasl_spec(sasl::INCLUDE_MECHANISMS);
        assert_eq!(format_value(&list(&["a", "b", "c"])), Some("a b c".into()));
        assert_eq!(unmarshal_value(&spec, "a b c").unwrap(), list(&["a", "b", "c"]));
    }

    #[test]
    fn empty_or_undefined_list_has_no_output() {
        let definition = sasl::definition().unwrap();
        let spec = definition.attributes.get(sasl::QOP).unwrap();
        let mut model = ResourceModel::new();
        assert_eq!(marshal_attribute(spec, &model), None);

        model
            .apply(
                &definition.attributes,
                vec![(sasl::QOP.into(), Some(Value::List(Vec::new())))],
                &PropertyResolver::default(),
            )
            .unwrap();
        assert_eq!(marshal_attribute(spec, &model), None);
    }

    #[test]
    fn blank_list_text_is_malformed() {
        let spec = sasl_spec(sasl::QOP);
        assert!(matches!(unmarshal_value(&spec, ""), Err(MgmtError::Marshal(_))));
        assert!(matches!(
            unmarshal_value(&spec, "auth  auth-int"),
            Err(MgmtError::Marshal(_))
        ));
    }

    #[test]
    fn wrapped_default_is_still_written() {
        let definition = sasl::definition().unwrap();
        let spec = definition.attributes.get(sasl::SERVER_AUTH).unwrap();
        let model = ResourceModel::populate(
            &definition.attributes,
            [(sasl::SERVER_AUTH.to_string(), Value::Bool(false))]
                .into_iter()
                .collect(),
            &PropertyResolver::default(),
        )
        .unwrap();
        assert_eq!(
            marshal_attribute(spec, &model),
            Some(Fragment::Element {
                name: sasl::SERVER_AUTH,
                text: "false".into()
            })
        );
    }

    #[test]
    fn scalars_round_trip() {
        let spec = sasl_spec(sasl::REUSE_SESSION);
        for value in [
            Value::Bool(true),
            Value::Bool(false),
            Value::Expression("${reuse:false}".into()),
        ] {
            let text = format_value(&value).unwrap();
            assert_eq!(unmarshal_value(&spec, &text).unwrap(), value);
        }
    }

    #[test]
    fn document_layout() {
        let registry = registry();
        let xml = write_document(&sample_tree(&registry), &registry).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<server xmlns=\"urn:mgmtmodel:1.0\">"));
        assert!(xml.contains("<subsystem name=\"remoting\">"));
        assert!(xml.contains("<connector name=\"default\" socket-binding=\"remoting\">"));
        assert!(xml.contains("<sasl>"));
        assert!(xml.contains("<include-mechanisms value=\"DIGEST-MD5 PLAIN\"/>"));
        assert!(xml.contains("<qop value=\"auth auth-int\"/>"));
        assert!(xml.contains("<server-auth value=\"false\"/>"));
        assert!(!xml.contains("<strength"));
        assert!(xml.contains("<remoting-connector name=\"jmx\" use-management-endpoint=\"false\"/>"));

        // registration order, not address order
        let expose = xml.find("<expose-model").unwrap();
        let connector = xml.find("<remoting-connector").unwrap();
        assert!(expose < connector);
    }

    #[test]
    fn document_round_trip() {
        let registry = registry();
        let tree = sample_tree(&registry);
        let xml = write_document(&tree, &registry).unwrap();
        let back = read_document(&xml, &registry, &PropertyResolver::default()).unwrap();
        assert_eq!(snapshot(&back), snapshot(&tree));
        assert!(back.iter().all(|(_, e)| e.state == ResourceState::Present));
    }

    #[test]
    fn empty_tree_round_trip() {
        let registry = registry();
        let xml = write_document(&ConfigTree::new(), &registry).unwrap();
        assert!(xml.contains("<server xmlns=\"urn:mgmtmodel:1.0\"/>"));
        let back = read_document(&xml, &registry, &PropertyResolver::default()).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn unknown_content_is_rejected() {
        let registry = registry();
        let resolver = PropertyResolver::default();
        let cases = [
            r#"<other xmlns="urn:mgmtmodel:1.0"/>"#,
            r#"<server xmlns="urn:elsewhere:1.0"/>"#,
            r#"<server xmlns="urn:mgmtmodel:1.0"><subsystem name="nope"/></server>"#,
            r#"<server xmlns="urn:mgmtmodel:1.0"><subsystem name="simple" color="red"/></server>"#,
            r#"<server xmlns="urn:mgmtmodel:1.0"><sasl/></server>"#,
            r#"<server xmlns="urn:mgmtmodel:1.0">text</server>"#,
        ];
        for xml in cases {
            assert!(
                matches!(read_document(xml, &registry, &resolver), Err(MgmtError::Marshal(_))),
                "{}",
                xml
            );
        }
    }

    #[test]
    fn loaded_values_are_validated() {
        let registry = registry();
        let xml = r#"<server xmlns="urn:mgmtmodel:1.0">
            <subsystem name="remoting">
                <connector name="a" socket-binding="r">
                    <sasl><qop value="AUTH"/></sasl>
                </connector>
            </subsystem>
        </server>"#;
        assert!(matches!(
            read_document(xml, &registry, &PropertyResolver::default()),
            Err(MgmtError::Validation(_))
        ));

        let missing = r#"<server xmlns="urn:mgmtmodel:1.0">
            <subsystem name="remoting"><connector name="a"/></subsystem>
        </server>"#;
        assert!(matches!(
            read_document(missing, &registry, &PropertyResolver::default()),
            Err(MgmtError::Validation(_))
        ));
    }

    #[test]
    fn case_insensitive_values_load_canonical() {
        let registry = registry();
        let xml = r#"<server xmlns="urn:mgmtmodel:1.0">
            <subsystem name="remoting">
                <connector name="a" socket-binding="r">
                    <sasl><strength value="HIGH Medium"/></sasl>
                </connector>
            </subsystem>
        </server>"#;
        let tree = read_document(xml, &registry, &PropertyResolver::default()).unwrap();
        let entry = tree
            .get(&Address::parse("/subsystem=remoting/connector=a/security=sasl").unwrap())
            .unwrap();
        assert_eq!(entry.model.get(sasl::STRENGTH), Some(&list(&["high", "medium"])));
    }
}
