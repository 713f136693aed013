//! CSS rules and keyframe animations.

use std::collections::BTreeMap;
use std::fmt;

use super::{Properties, Servable, set_property};
use crate::error::{Error, Result};

fn push_block(props: &Properties, out: &mut String) {
    out.push('{');
    for (key, value) in props {
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push(';');
    }
    out.push('}');
}

/// A CSS rule. The name is the selector, written as given.
#[derive(Debug, Clone)]
pub struct Style {
    name: String,
    properties: Properties,
}

impl Style {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            name: selector.into(),
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        set_property(&mut self, key, value);
        self
    }

    /// The class a component needs to be matched by this rule.
    pub fn class_name(&self) -> &str {
        self.name.strip_prefix('.').unwrap_or(&self.name)
    }

    /// `selector {k:v;}` without the surrounding `<style>` element.
    pub fn render_rule(&self, out: &mut String) {
        out.push_str(&self.name);
        out.push(' ');
        push_block(&self.properties, out);
    }
}

impl Servable for Style {
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
        out.push_str("<style>");
        self.render_rule(out);
        out.push_str("</style>");
    }

    fn clone_box(&self) -> Box<dyn Servable> {
        Box::new(self.clone())
    }
}

/// Copies `src`'s declarations into `dst`, `src` winning on collisions.
pub fn merge_style(dst: &mut Style, src: &Style) {
    super::copy_properties(dst, src);
}

/// Keyframe position: a percentage or the `from`/`to` aliases.
pub trait IntoKeyframe {
    fn into_percent(self) -> Result<u8>;
}

impl IntoKeyframe for u8 {
    fn into_percent(self) -> Result<u8> {
        if self > 100 {
            return Err(Error::InvalidKeyframe(self.to_string()));
        }
        Ok(self)
    }
}

impl IntoKeyframe for &str {
    fn into_percent(self) -> Result<u8> {
        let key = self.trim();
        match key {
            "from" => Ok(0),
            "to" => Ok(100),
            _ => key
                .strip_suffix('%')
                .unwrap_or(key)
                .parse::<u8>()
                .map_err(|_| Error::InvalidKeyframe(self.to_string()))?
                .into_percent(),
        }
    }
}

/// A `@keyframes` animation.
///
/// Keyframes render in ascending percentage order whatever order they were
/// set in. The property bag holds the `animation-*` declarations that
/// [`animate`] copies onto a [`Style`].
#[derive(Debug, Clone)]
pub struct Animation {
    name: String,
    properties: Properties,
    keyframes: BTreeMap<u8, Properties>,
}

impl Animation {
    /// A 5.2 second, single-iteration animation with no delay.
    pub fn new(name: impl Into<String>) -> Self {
        let mut anim = Self {
            name: name.into(),
            properties: Properties::new(),
            keyframes: BTreeMap::new(),
        };
        anim.set_length(5.2);
        anim.set_delay(0.0);
        anim.set_iterations(Some(1));
        anim
    }

    /// Duration in seconds.
    pub fn set_length(&mut self, seconds: f64) -> &mut Self {
        set_property(self, "animation-duration", format!("{seconds}s"));
        self
    }

    pub fn set_delay(&mut self, seconds: f64) -> &mut Self {
        set_property(self, "animation-delay", format!("{seconds}s"));
        self
    }

    /// `None` loops forever.
    pub fn set_iterations(&mut self, count: Option<u32>) -> &mut Self {
        match count {
            Some(n) => set_property(self, "animation-iteration-count", n),
            None => set_property(self, "animation-iteration-count", "infinite"),
        }
        self
    }

    /// Replaces the keyframe at `key` with `declarations`.
    pub fn set_keyframe<K, I, P, V>(&mut self, key: K, declarations: I) -> Result<&mut Self>
    where
        K: IntoKeyframe,
        I: IntoIterator<Item = (P, V)>,
        P: Into<String>,
        V: fmt::Display,
    {
        let percent = key.into_percent()?;
        let props = declarations
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        self.keyframes.insert(percent, props);
        Ok(self)
    }

    /// Adds one declaration to the keyframe at `key`, creating it if needed.
    pub fn push_keyframe<K>(
        &mut self,
        key: K,
        property: impl Into<String>,
        value: impl fmt::Display,
    ) -> Result<&mut Self>
    where
        K: IntoKeyframe,
    {
        let percent = key.into_percent()?;
        self.keyframes
            .entry(percent)
            .or_default()
            .insert(property.into(), value.to_string());
        Ok(self)
    }

    /// Removes a keyframe. Returns whether one was there.
    pub fn delete_keyframe<K: IntoKeyframe>(&mut self, key: K) -> Result<bool> {
        let percent = key.into_percent()?;
        Ok(self.keyframes.remove(&percent).is_some())
    }

    pub fn keyframe<K: IntoKeyframe>(&self, key: K) -> Result<&Properties> {
        let percent = key.into_percent()?;
        self.keyframes
            .get(&percent)
            .ok_or_else(|| Error::PropertyNotFound(format!("{percent}%")))
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// `@keyframes name {0% {...} ...}` without the `<style>` element.
    pub fn render_rule(&self, out: &mut String) {
        out.push_str("@keyframes ");
        out.push_str(&self.name);
        out.push_str(" {");
        for (percent, props) in &self.keyframes {
            out.push_str(&percent.to_string());
            out.push_str("% ");
            push_block(props, out);
        }
        out.push('}');
    }
}

impl Servable for Animation {
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
        out.push_str("<style>");
        self.render_rule(out);
        out.push_str("</style>");
    }

    fn clone_box(&self) -> Box<dyn Servable> {
        Box::new(self.clone())
    }
}

/// Runs `animation` on elements matched by `style`.
///
/// Only the name is recorded; the animation must be written to the same
/// response for the browser to find it.
pub fn animate(style: &mut Style, animation: &Animation) {
    set_property(style, "animation-name", &animation.name);
    super::copy_properties(style, animation);
}

/// One entry of a [`StyleSheet`].
#[derive(Debug, Clone)]
pub enum Rule {
    Style(Style),
    Animation(Animation),
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::Style(s) => s.name(),
            Rule::Animation(a) => a.name(),
        }
    }

    fn render_rule(&self, out: &mut String) {
        match self {
            Rule::Style(s) => s.render_rule(out),
            Rule::Animation(a) => a.render_rule(out),
        }
    }
}

impl From<Style> for Rule {
    fn from(style: Style) -> Self {
        Rule::Style(style)
    }
}

impl From<Animation> for Rule {
    fn from(animation: Animation) -> Self {
        Rule::Animation(animation)
    }
}

/// Several rules in one `<style>` element, in push order.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    name: String,
    properties: Properties,
    rules: Vec<Rule>,
}

impl StyleSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
            rules: Vec::new(),
        }
    }

    pub fn push(&mut self, rule: impl Into<Rule>) -> &mut Self {
        self.rules.push(rule.into());
        self
    }

    pub fn rule(mut self, rule: impl Into<Rule>) -> Self {
        self.push(rule);
        self
    }

    /// First rule with the given selector or animation name.
    pub fn get_rule_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.name() == name)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl Servable for StyleSheet {
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
        out.push_str("<style");
        if !self.name.is_empty() {
            out.push_str(" id=\"");
            super::escape_attr(&self.name, out);
            out.push('"');
        }
        out.push('>');
        for rule in &self.rules {
            rule.render_rule(out);
        }
        out.push_str("</style>");
    }

    fn clone_box(&self) -> Box<dyn Servable> {
        Box::new(self.clone())
    }
}
