use std::fmt;

use super::{Properties, Servable, escape_attr, set_property};

/// Tags that never carry content or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// A tagged markup node.
///
/// Renders as `<tag id="name" k="v"...>text children</tag>`. The `text`
/// property becomes inner content verbatim, so it may carry markup; every
/// other property is an escaped attribute in insertion order. An empty name
/// emits no `id`.
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    tag: String,
    properties: Properties,
    children: Vec<Box<dyn Servable>>,
}

impl Component {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Builder form of [`set_property`].
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        set_property(&mut self, key, value);
        self
    }

    pub fn text(self, text: impl fmt::Display) -> Self {
        self.with("text", text)
    }

    /// Builder form of [`Component::push`].
    pub fn child<S: Servable + 'static>(mut self, child: S) -> Self {
        self.push(child);
        self
    }

    /// Appends a child after the existing ones.
    pub fn push<S: Servable + 'static>(&mut self, child: S) -> &mut Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push_boxed(&mut self, child: Box<dyn Servable>) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Appends several children, keeping the iterator's order.
    pub fn extend<I>(&mut self, children: I) -> &mut Self
    where
        I: IntoIterator<Item = Box<dyn Servable>>,
    {
        self.children.extend(children);
        self
    }

    pub fn children(&self) -> &[Box<dyn Servable>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Box<dyn Servable>> {
        &mut self.children
    }

    fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }
}

impl Servable for Component {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn render_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);

        if !self.name.is_empty() {
            out.push_str(" id=\"");
            escape_attr(&self.name, out);
            out.push('"');
        }

        for (key, value) in self.properties.iter().filter(|(k, _)| *k != "text") {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }
        out.push('>');

        if self.is_void() {
            return;
        }

        if let Some(text) = self.properties.get("text") {
            out.push_str(text);
        }
        for child in &self.children {
            child.render_into(out);
        }

        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }

    fn clone_box(&self) -> Box<dyn Servable> {
        Box::new(self.clone())
    }
}
