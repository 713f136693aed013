//! Shorthand constructors for common elements.
//!
//! ```
//! use weft::servable::{Servable, tags::{div, h1}};
//!
//! let page = div("main").child(h1("title").text("Whoa!"));
//! assert_eq!(page.render(), r#"<div id="main"><h1 id="title">Whoa!</h1></div>"#);
//! ```

use super::Component;

macro_rules! tags {
    ($($tag:ident),* $(,)?) => {
        $(
            #[doc = concat!("A `<", stringify!($tag), ">` component.")]
            pub fn $tag(name: impl Into<String>) -> Component {
                Component::new(name, stringify!($tag))
            }
        )*
    };
}

tags!(
    a, body, br, button, div, footer, form, h1, h2, h3, header, hr, img, input, label, li, link, meta,
    p, section, span, ul,
);
