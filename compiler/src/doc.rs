// Document tree for SpineML markup.
//
// Read-only element tree produced by the parser and walked by the component
// reader and the network driver. Queries mirror the handful of navigation
// primitives the translation needs: child lookup by name, attribute lookup,
// and trimmed character data.
//
// Preconditions: produced by the parser from a well-formed token stream.
// Postconditions: each element's span covers the whole element.
// Failure modes: `require_*` helpers return configuration errors.
// Side effects: none.

use chumsky::span::SimpleSpan;

use crate::diag::{codes, Result, TranslateError};

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// A parsed markup document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Root element if it carries the given name.
    pub fn root_named(&self, name: &str) -> Option<&Element> {
        (self.root.name == name).then_some(&self.root)
    }
}

/// One element: name, ordered attributes, child elements and concatenated
/// character data.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
    pub span: Span,
}

impl Element {
    pub fn new(name: String, attributes: Vec<(String, String)>, span: Span) -> Self {
        Element {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
            span,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Character data with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Trimmed text of the first child with the given name (the `MathInline`
    /// convention used throughout SpineML).
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// Whether a child `child[@attr='value']` exists.
    pub fn has_child_with_attr(&self, child: &str, attr: &str, value: &str) -> bool {
        self.children(child).any(|c| c.attr(attr) == Some(value))
    }

    /// Short description used as error context, e.g. `OnCondition[@target_regime='b']`.
    pub fn describe(&self) -> String {
        match self.attributes.first() {
            Some((name, value)) => format!("{}[@{}='{}']", self.name, name, value),
            None => self.name.clone(),
        }
    }

    pub fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            TranslateError::configuration(
                codes::E0105,
                self.describe(),
                format!("missing required attribute '{}'", name),
            )
        })
    }

    pub fn require_child(&self, name: &str) -> Result<&Element> {
        self.child(name).ok_or_else(|| {
            TranslateError::configuration(
                codes::E0106,
                self.describe(),
                format!("'{}' node has no '{}' node", self.name, name),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        use chumsky::span::Span as _;
        Span::new((), 0..1)
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> Element {
        Element::new(
            name.to_string(),
            attrs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            span(),
        )
    }

    #[test]
    fn child_queries_follow_document_order() {
        let mut regime = element("Regime", &[("name", "a")]);
        regime.children.push(element("OnCondition", &[("target_regime", "b")]));
        regime.children.push(element("TimeDerivative", &[("variable", "V")]));
        regime.children.push(element("OnCondition", &[("target_regime", "c")]));

        let targets: Vec<_> = regime
            .children("OnCondition")
            .filter_map(|c| c.attr("target_regime"))
            .collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert_eq!(
            regime.child("TimeDerivative").and_then(|t| t.attr("variable")),
            Some("V")
        );
        assert!(regime.child("OnEvent").is_none());
    }

    #[test]
    fn text_is_trimmed() {
        let mut math = element("MathInline", &[]);
        math.text = "\n   V > 30\n ".to_string();
        let mut trigger = element("Trigger", &[]);
        trigger.children.push(math);
        assert_eq!(trigger.child_text("MathInline"), Some("V > 30"));
    }

    #[test]
    fn has_child_with_attr_matches_value() {
        let mut cond = element("OnCondition", &[]);
        cond.children.push(element("EventOut", &[("port", "spike")]));
        assert!(cond.has_child_with_attr("EventOut", "port", "spike"));
        assert!(!cond.has_child_with_attr("EventOut", "port", "burst"));
    }

    #[test]
    fn require_attr_reports_node() {
        let node = element("Parameter", &[("dimension", "mV")]);
        let err = node.require_attr("name").unwrap_err();
        assert_eq!(err.code(), codes::E0105);
        assert!(format!("{err}").contains("Parameter[@dimension='mV']"));
    }

    #[test]
    fn root_named() {
        let doc = Document {
            root: element("SpineML", &[]),
        };
        assert!(doc.root_named("SpineML").is_some());
        assert!(doc.root_named("LL:SpineML").is_none());
    }
}
