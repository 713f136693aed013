//! Renderable markup trees.
//!
//! A [`Servable`] is anything with a property bag that renders to text.
//! [`Component`] is a tagged node with ordered children, [`Style`] a CSS
//! rule, [`Animation`] a `@keyframes` block and [`StyleSheet`] a group of
//! the latter two in one `<style>` element. [`File`] renders a file from
//! disk.
//!
//! Rendering never mutates, so one instance can be rendered any number of
//! times, including after further edits.

pub mod component;
pub mod file;
pub mod style;
pub mod tags;

use std::fmt;

use indexmap::IndexMap;

use crate::connection::Connection;
use crate::error::{Error, Result};

pub use component::Component;
pub use file::File;
pub use style::{Animation, IntoKeyframe, Rule, Style, StyleSheet, animate, merge_style};

/// Insertion-ordered property bag. Keys are unique, re-setting overwrites
/// in place without moving the key.
pub type Properties = IndexMap<String, String>;

pub trait Servable: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    /// Appends the rendered form to `out`.
    fn render_into(&self, out: &mut String);

    fn clone_box(&self) -> Box<dyn Servable>;

    fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    /// Reads a property. Missing keys are an error, never an empty string.
    fn get(&self, key: &str) -> Result<&str> {
        self.properties()
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::PropertyNotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) {
        set_property(self, key, value);
    }

    /// Answers a request with this servable as the whole response body.
    fn serve(&self, conn: &mut Connection) -> Result<()> {
        let mut out = String::new();
        self.render_into(&mut out);
        conn.write(out.as_str());
        Ok(())
    }
}

impl Clone for Box<dyn Servable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Sets `key` to `value`, overwriting any previous value.
pub fn set_property<S>(servable: &mut S, key: impl Into<String>, value: impl fmt::Display)
where
    S: Servable + ?Sized,
{
    servable
        .properties_mut()
        .insert(key.into(), value.to_string());
}

pub fn get_property<'a, S>(servable: &'a S, key: &str) -> Result<&'a str>
where
    S: Servable + ?Sized,
{
    servable.get(key)
}

/// Copies every property of `src` into `dst`, overwriting collisions.
/// Children are left alone.
pub fn copy_properties<D, S>(dst: &mut D, src: &S)
where
    D: Servable + ?Sized,
    S: Servable + ?Sized,
{
    let props = dst.properties_mut();
    for (k, v) in src.properties() {
        props.insert(k.clone(), v.clone());
    }
}

/// Marks `servable` with the class a [`Style`] selects on.
///
/// Pairing happens by name: `.card` and `card` both set `class="card"`.
/// The style itself still has to be written to the same response.
pub fn apply_style<S>(servable: &mut S, style: &Style)
where
    S: Servable + ?Sized,
{
    set_property(servable, "class", style.class_name());
}

/// Anything [`Connection::write`](crate::connection::Connection::write)
/// accepts.
pub trait Writable {
    fn write_into(&self, out: &mut String);
}

impl Writable for str {
    fn write_into(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl Writable for String {
    fn write_into(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl Writable for dyn Servable {
    fn write_into(&self, out: &mut String) {
        self.render_into(out);
    }
}

macro_rules! writable_servable {
    ($($ty:ty),*) => {
        $(impl Writable for $ty {
            fn write_into(&self, out: &mut String) {
                self.render_into(out);
            }
        })*
    };
}

writable_servable!(Component, File, Style, Animation, StyleSheet);

impl<T: Writable + ?Sized> Writable for Box<T> {
    fn write_into(&self, out: &mut String) {
        (**self).write_into(out);
    }
}

impl<T: Writable + ?Sized> Writable for &T {
    fn write_into(&self, out: &mut String) {
        (**self).write_into(out);
    }
}

impl<T: Writable> Writable for [T] {
    fn write_into(&self, out: &mut String) {
        for item in self {
            item.write_into(out);
        }
    }
}

impl<T: Writable> Writable for Vec<T> {
    fn write_into(&self, out: &mut String) {
        self.as_slice().write_into(out);
    }
}

pub(crate) fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
