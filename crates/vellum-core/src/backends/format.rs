use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ComputeResult;

pub const RELATED_QUERY_CLASS: &str = "compute-related-query";
pub const NO_RESULTS_HTML: &str = r#"<div class="alert alert-warning" role="alert">No results</div>"#;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComputeFormat {
    #[default]
    Html,
    Markdown,
    Raw,
}

pub fn format_results(results: &[ComputeResult], format: ComputeFormat) -> String {
    match format {
        ComputeFormat::Html => format_to_html(results),
        ComputeFormat::Markdown => format_to_markdown(results),
        ComputeFormat::Raw => serde_json::to_string_pretty(results).unwrap_or_default(),
    }
}

/// Related queries are emitted as clickable `li.compute-related-query`
/// items carrying the query in `data-query`.
pub fn format_to_html(results: &[ComputeResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_HTML.to_string();
    }

    let mut out = String::from(r#"<div class="compute-results">"#);
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            out.push_str("<hr />\n");
        }
        if let Some(title) = &result.title {
            out.push_str(&format!("<h2>{}</h2>\n", encode_text(title)));
        }
        if let Some(plaintext) = &result.plaintext {
            out.push_str(&format!(
                "<p><strong>Expr:</strong> {}</p>\n",
                encode_text(plaintext)
            ));
        }
        if let Some(data) = &result.img_base64 {
            let content_type = result.img_contenttype.as_deref().unwrap_or("image/png");
            out.push_str(&format!(
                "<p><img src=\"data:{};base64,{}\" alt=\"{}\" /></p>\n",
                encode_double_quoted_attribute(content_type),
                encode_double_quoted_attribute(data),
                encode_double_quoted_attribute(result.title.as_deref().unwrap_or("Image")),
            ));
        }
        if let Some(minput) = &result.minput {
            out.push_str(&format!(
                "<p><strong>Mathematica Input:</strong> {}</p>\n",
                encode_text(minput)
            ));
        }
        if let Some(moutput) = &result.moutput {
            out.push_str(&format!(
                "<p><strong>Mathematica Output:</strong> {}</p>\n",
                encode_text(moutput)
            ));
        }
        if !result.related_queries.is_empty() {
            out.push_str("<p><strong>Related Queries:</strong></p>\n<ul>\n");
            for query in &result.related_queries {
                out.push_str(&format!(
                    "<li class=\"{RELATED_QUERY_CLASS}\" data-query=\"{}\">{}</li>\n",
                    encode_double_quoted_attribute(query),
                    encode_text(query)
                ));
            }
            out.push_str("</ul>\n");
        }
    }
    out.push_str("</div>\n");
    out
}

pub fn format_to_markdown(results: &[ComputeResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_HTML.to_string();
    }

    let mut out = String::new();
    for result in results {
        if let Some(title) = &result.title {
            out.push_str(&format!("{title}\n"));
        }
        if let Some(plaintext) = &result.plaintext {
            out.push_str(&format!("Expr:{plaintext}\n"));
        }
        if let Some(data) = &result.img_base64 {
            let content_type = result.img_contenttype.as_deref().unwrap_or("image/png");
            out.push_str(&format!("![Image](data:{content_type};base64,{data})\n"));
        }
        if let Some(minput) = &result.minput {
            out.push_str(&format!("Mathematica Input:{minput}\n"));
        }
        if let Some(moutput) = &result.moutput {
            out.push_str(&format!("Mathematica Output:{moutput}\n"));
        }
        if !result.related_queries.is_empty() {
            out.push_str("Related Queries:\n");
            for query in &result.related_queries {
                out.push_str(&format!("{query}\n"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn sample() -> Vec<ComputeResult> {
        vec![
            ComputeResult {
                title: Some("Input".to_string()),
                plaintext: Some("x < 2".to_string()),
                ..Default::default()
            },
            ComputeResult {
                title: Some("Plot".to_string()),
                img_base64: Some("AAAA".to_string()),
                related_queries: vec!["x > 2".to_string()],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn html_escapes_text_and_marks_related_queries() {
        let html = format_to_html(&sample());
        assert!(html.contains("<h2>Input</h2>"));
        assert!(html.contains("x &lt; 2"));
        assert!(html.contains("data:image/png;base64,AAAA"));
        assert!(html.contains(r#"<li class="compute-related-query" data-query="x &gt; 2">"#));
        assert_eq!(html.matches("<hr />").count(), 1);
    }

    #[test]
    fn markdown_inlines_images() {
        let md = format_to_markdown(&sample());
        assert!(md.starts_with("Input\nExpr:x < 2\n"));
        assert!(md.contains("![Image](data:image/png;base64,AAAA)"));
        assert!(md.ends_with("Related Queries:\nx > 2\n"));
    }

    #[test]
    fn empty_results_show_warning() {
        assert_eq!(format_to_html(&[]), NO_RESULTS_HTML);
        assert_eq!(format_results(&[], ComputeFormat::Markdown), NO_RESULTS_HTML);
    }

    #[rstest]
    #[case("html", ComputeFormat::Html)]
    #[case("markdown", ComputeFormat::Markdown)]
    #[case("raw", ComputeFormat::Raw)]
    fn format_names_parse(#[case] name: &str, #[case] expected: ComputeFormat) {
        assert_eq!(ComputeFormat::from_str(name).ok(), Some(expected));
        assert_eq!(expected.to_string(), name);
    }
}
