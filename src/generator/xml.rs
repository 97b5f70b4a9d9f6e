//! Minimal XML element tree for CommerceML documents.

use std::fmt::Write;

/// XML element with attributes, optional text and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Element holding only text
    pub fn leaf(name: impl Into<String>, text: impl ToString) -> Self {
        Self::new(name).with_text(text)
    }

    /// Add an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attrs.push((key.into(), value.to_string()));
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl ToString) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Append a child
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append a text-only child
    pub fn field(self, name: impl Into<String>, text: impl ToString) -> Self {
        self.child(Self::leaf(name, text))
    }

    /// Append children
    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Child elements
    pub fn child_elements(&self) -> &[XmlElement] {
        &self.children
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render as a standalone UTF-8 document
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        self.write_to(&mut out, 0);
        out
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.name);
        for (key, value) in &self.attrs {
            let _ = write!(out, " {key}=\"{}\"", escape(value));
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape(text), self.name);
            },
            (text, false) => {
                out.push('>');
                if let Some(text) = text {
                    out.push_str(&escape(text));
                }
                out.push('\n');
                for child in &self.children {
                    child.write_to(out, depth + 1);
                }
                let _ = writeln!(out, "{indent}</{}>", self.name);
            },
        }
    }
}

/// Escape text for element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let doc = XmlElement::new("Товар")
            .attr("Код", 750)
            .field("Ид", "a&b")
            .child(XmlElement::new("Описание"))
            .to_document();

        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\""));
        assert!(doc.contains("<Товар Код=\"750\">\n"));
        assert!(doc.contains("\t<Ид>a&amp;b</Ид>\n"));
        assert!(doc.contains("\t<Описание/>\n"));
        assert!(doc.ends_with("</Товар>\n"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<"x" & 'y'>"#), "&lt;&quot;x&quot; &amp; &apos;y&apos;&gt;");
    }
}
