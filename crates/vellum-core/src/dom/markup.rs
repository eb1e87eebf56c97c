use html_escape::{encode_double_quoted_attribute, encode_text};

/// An owned element tree, produced by handlers and inserted into a
/// [`Document`](super::Document) with `append_markup`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub classes: Vec<String>,
    /// Raw inner markup, emitted before `children`.
    pub html: String,
    pub children: Vec<Markup>,
}

impl Markup {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn div() -> Self {
        Self::element("div")
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html.push_str(&html.into());
        self
    }

    /// Appends escaped text.
    pub fn text(mut self, text: &str) -> Self {
        self.html.push_str(&encode_text(text));
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Depth-first search, including `self`.
    pub fn find(&self, predicate: &dyn Fn(&Markup) -> bool) -> Option<&Markup> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        write_open_tag(
            out,
            &self.tag,
            &self.classes,
            self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        );
        out.push_str(&self.html);
        for child in &self.children {
            child.write_html(out);
        }
        write_close_tag(out, &self.tag);
    }
}

pub(crate) fn write_open_tag<'a>(
    out: &mut String,
    tag: &str,
    classes: &[String],
    attributes: impl Iterator<Item = (&'a str, &'a str)>,
) {
    out.push('<');
    out.push_str(tag);
    if !classes.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&encode_double_quoted_attribute(&classes.join(" ")));
        out.push('"');
    }
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn write_close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_inner_markup_before_children() {
        let markup = Markup::div()
            .id("a")
            .class("one")
            .class("two")
            .attr("data-x", "say \"hi\"")
            .html("<b>x</b>")
            .child(Markup::element("span").text("<y>"));

        assert_eq!(
            markup.to_html(),
            r#"<div class="one two" id="a" data-x="say &quot;hi&quot;"><b>x</b><span>&lt;y&gt;</span></div>"#
        );
    }

    #[test]
    fn attr_replaces_existing_value() {
        let markup = Markup::div().attr("k", "1").attr("k", "2");
        assert_eq!(markup.attributes.len(), 1);
        assert_eq!(markup.attribute("k"), Some("2"));
    }
}
