/// Structured view of a node's `node_type` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTag {
    Variable(String),
    String(String),
    Number(String),
    Boolean(Option<String>),
    Null,
    GetAttr,
    LambdaCall,
    Tuple,
    Assign,
    Expressions,
    Other {
        name: String,
        literal: Option<String>,
    },
}

const COMPOSITE_TAGS: &[&str] = &["List", "Map", "Set", "KeyValue", "Dict", "Array"];

impl NodeTag {
    pub fn parse(node_type: &str) -> Self {
        let trimmed = node_type.trim();
        let (name, literal) = split_tag(trimmed);

        match (name, literal) {
            ("Variable", Some(lit)) => NodeTag::Variable(lit),
            ("String", Some(lit)) => NodeTag::String(lit),
            ("Number", Some(lit)) => NodeTag::Number(lit),
            ("Boolean", lit) => NodeTag::Boolean(lit),
            ("Null" | "None", None) => NodeTag::Null,
            ("GetAttr", None) => NodeTag::GetAttr,
            ("LambdaCall", None) => NodeTag::LambdaCall,
            ("Tuple" | "AssumeTuple", None) => NodeTag::Tuple,
            ("Assign", None) => NodeTag::Assign,
            ("Expressions", None) => NodeTag::Expressions,
            (name, literal) => NodeTag::Other {
                name: name.to_string(),
                literal,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeTag::Variable(_) => "Variable",
            NodeTag::String(_) => "String",
            NodeTag::Number(_) => "Number",
            NodeTag::Boolean(_) => "Boolean",
            NodeTag::Null => "Null",
            NodeTag::GetAttr => "GetAttr",
            NodeTag::LambdaCall => "LambdaCall",
            NodeTag::Tuple => "Tuple",
            NodeTag::Assign => "Assign",
            NodeTag::Expressions => "Expressions",
            NodeTag::Other { name, .. } => name.as_str(),
        }
    }

    /// Tuples, lists and maps. Call arguments never decode these.
    pub fn is_composite(&self) -> bool {
        match self {
            NodeTag::Tuple => true,
            NodeTag::Other { name, .. } => COMPOSITE_TAGS.contains(&name.as_str()),
            _ => false,
        }
    }
}

fn split_tag(tag: &str) -> (&str, Option<String>) {
    let Some(open) = tag.find('(') else {
        return (tag, None);
    };
    if !tag.ends_with(')') {
        return (tag, None);
    }
    let name = &tag[..open];
    let inner = &tag[open + 1..tag.len() - 1];
    (name, Some(unquote_debug(inner)))
}

/// Reverses `format!("{:?}", s)` for a string literal. Unquoted input is
/// returned as-is (e.g. `Boolean(true)`).
fn unquote_debug(inner: &str) -> String {
    let Some(body) = inner
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return inner.to_string();
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let mut hex = String::new();
                let mut closed = false;
                if chars.next() == Some('{') {
                    for h in chars.by_ref() {
                        if h == '}' {
                            closed = true;
                            break;
                        }
                        hex.push(h);
                    }
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if closed => out.push(decoded),
                    _ => {
                        out.push_str("\\u{");
                        out.push_str(&hex);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_tags() {
        assert_eq!(
            NodeTag::parse("Variable(\"default_api\")"),
            NodeTag::Variable("default_api".to_string())
        );
        assert_eq!(
            NodeTag::parse("String(\"graph TD; A-->B\")"),
            NodeTag::String("graph TD; A-->B".to_string())
        );
        assert_eq!(NodeTag::parse("Boolean"), NodeTag::Boolean(None));
        assert_eq!(NodeTag::parse("AssumeTuple"), NodeTag::Tuple);
        assert_eq!(NodeTag::parse("Null"), NodeTag::Null);
    }

    #[test]
    fn unescapes_debug_strings() {
        let tag = NodeTag::parse(r#"String("line1\nsay \"hi\" \u{1f600}")"#);
        assert_eq!(
            tag,
            NodeTag::String("line1\nsay \"hi\" \u{1f600}".to_string())
        );
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let tag = NodeTag::parse("Operation(\"+\")");
        assert_eq!(
            tag,
            NodeTag::Other {
                name: "Operation".to_string(),
                literal: Some("+".to_string()),
            }
        );
        assert!(!tag.is_composite());
        assert!(NodeTag::parse("Map").is_composite());
    }
}
