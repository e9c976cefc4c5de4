//! Route templates for observable queries.
//!
//! A template is a path such as `/api/accounts/{{accountId}}/items/{kind}`.
//! Both `{{name}}` and `{name}` mark a placeholder.  Rendering substitutes
//! argument text (see [`argument_text`](crate::models::argument_text)),
//! percent-encoded as a single path segment; a missing argument renders as
//! empty text.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::form_urlencoded;

use crate::error::{ObservableLinkError, Result};
use crate::models::QueryArguments;

/// Characters escaped in a substituted path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template. The route must be absolute (start with `/`).
    pub fn parse(template: &str) -> Result<Self> {
        if !template.starts_with('/') {
            return Err(ObservableLinkError::ConfigurationError(format!(
                "Route '{}' must start with '/'",
                template
            )));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open..];
            let (closing, inner) = match after.strip_prefix("{{") {
                Some(inner) => ("}}", inner),
                None => ("}", &after[1..]),
            };
            let end = inner.find(closing).ok_or_else(|| {
                ObservableLinkError::ConfigurationError(format!(
                    "Unterminated placeholder in route '{}'",
                    template
                ))
            })?;

            let name = inner[..end].trim();
            if name.is_empty() || name.contains('{') {
                return Err(ObservableLinkError::ConfigurationError(format!(
                    "Invalid placeholder in route '{}'",
                    template
                )));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name.to_string()));
            rest = &inner[end + closing.len()..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute placeholders only. Values never introduce path
    /// separators, query strings or fragments.
    pub fn render(&self, args: &QueryArguments) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(text) = args.text(name) {
                        out.extend(utf8_percent_encode(&text, PATH_SEGMENT));
                    }
                },
            }
        }
        out
    }

    /// Substitute placeholders, then append every declared request argument
    /// the template did not consume as a query string.
    pub fn resolve(&self, args: &QueryArguments, request_arguments: &[String]) -> String {
        let mut route = self.render(args);

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut appended = false;
        for name in request_arguments {
            if self.placeholders().any(|p| p == name) {
                continue;
            }
            // Null counts as absent.
            if args.get(name).map_or(true, |value| value.is_null()) {
                continue;
            }
            if let Some(text) = args.text(name) {
                query.append_pair(name, &text);
                appended = true;
            }
        }

        if appended {
            route.push(if route.contains('?') { '&' } else { '?' });
            route.push_str(&query.finish());
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_render_double_braces() {
        let template = RouteTemplate::parse("/api/accounts/{{accountId}}/items").unwrap();
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["accountId"]);

        let args = QueryArguments::new().with("accountId", 42);
        assert_eq!(template.render(&args), "/api/accounts/42/items");
    }

    #[test]
    fn test_single_braces_and_raw_strings() {
        let template = RouteTemplate::parse("/api/{kind}/{id}").unwrap();
        let args = QueryArguments::new().with("kind", "orders").with("id", "a-1");
        assert_eq!(template.render(&args), "/api/orders/a-1");
    }

    #[test]
    fn test_missing_argument_renders_empty() {
        let template = RouteTemplate::parse("/api/items/{{id}}").unwrap();
        assert_eq!(template.render(&QueryArguments::new()), "/api/items/");
    }

    #[test]
    fn test_resolve_appends_unused_request_arguments() {
        let template = RouteTemplate::parse("/api/items/{{id}}").unwrap();
        let args = QueryArguments::new()
            .with("id", 7)
            .with("filter", "a b&c")
            .with("ignored", json!(true));
        let declared = vec!["id".to_string(), "filter".to_string(), "absent".to_string()];

        assert_eq!(template.resolve(&args, &declared), "/api/items/7?filter=a+b%26c");
    }

    #[test]
    fn test_resolve_extends_existing_query_string() {
        let template = RouteTemplate::parse("/api/items?mode=live").unwrap();
        let args = QueryArguments::new().with("page", 2);
        assert_eq!(
            template.resolve(&args, &["page".to_string()]),
            "/api/items?mode=live&page=2"
        );
    }

    #[test]
    fn test_reserved_characters_stay_inside_segment() {
        let template = RouteTemplate::parse("/api/items/{{name}}").unwrap();
        let args = QueryArguments::new()
            .with("name", "a b/../admin?x=1#frag")
            .with("q", "a b");

        assert_eq!(
            template.resolve(&args, &["name".to_string(), "q".to_string()]),
            "/api/items/a%20b%2F..%2Fadmin%3Fx=1%23frag?q=a+b"
        );
    }

    #[test]
    fn test_percent_and_unicode_are_encoded() {
        let template = RouteTemplate::parse("/api/{kind}").unwrap();
        let args = QueryArguments::new().with("kind", "100%ü");
        assert_eq!(template.render(&args), "/api/100%25%C3%BC");
    }

    #[test]
    fn test_null_request_argument_is_not_appended() {
        let template = RouteTemplate::parse("/api/items").unwrap();
        let args = QueryArguments::new().with("page", json!(null)).with("mode", "live");
        assert_eq!(
            template.resolve(&args, &["page".to_string(), "mode".to_string()]),
            "/api/items?mode=live"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(RouteTemplate::parse("api/items").is_err());
        assert!(RouteTemplate::parse("/api/{{id").is_err());
        assert!(RouteTemplate::parse("/api/{}").is_err());
    }
}
