use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of children requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Offset of the first page. The endpoint counts from 1.
pub const FIRST_OFFSET: usize = 1;

/// Parent identifier that addresses the top level of a book's catalog.
pub const ROOT_PARENT: &str = "";

/// One node of the remote catalog tree, as delivered in a page of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode {
    /// Opaque identifier; also the `code` used to page through this node's children.
    #[serde(deserialize_with = "string_or_number")]
    pub no: String,
    #[serde(default)]
    pub title: String,
    /// Raw flag as sent by the server, `"Y"` or `"N"` in practice.
    #[serde(rename = "hasChild", default)]
    pub has_child: String,
}

impl CatalogNode {
    pub fn new(no: impl Into<String>, title: impl Into<String>, has_child: impl Into<String>) -> Self {
        Self {
            no: no.into(),
            title: title.into(),
            has_child: has_child.into(),
        }
    }

    pub fn child_flag(&self) -> ChildFlag {
        ChildFlag::parse(&self.has_child)
    }
}

/// Parsed form of the `hasChild` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildFlag {
    Yes,
    No,
    Unknown,
}

impl ChildFlag {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Y" => ChildFlag::Yes,
            "N" => ChildFlag::No,
            _ => ChildFlag::Unknown,
        }
    }
}

/// One page of children for a parent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogPage {
    /// Number of children the server says the parent has, across all pages.
    pub total: usize,
    pub nodes: Vec<CatalogNode>,
}

impl CatalogPage {
    pub fn new(total: usize, nodes: Vec<CatalogNode>) -> Self {
        Self { total, nodes }
    }
}

/// Wire shape: `{ "data": { "total": n, "data": [ ... ] } }`
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogEnvelope {
    data: WirePage,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    total: usize,
    #[serde(default)]
    data: Option<Vec<CatalogNode>>,
}

impl From<CatalogEnvelope> for CatalogPage {
    fn from(envelope: CatalogEnvelope) -> Self {
        CatalogPage {
            total: envelope.data.total,
            nodes: envelope.data.data.unwrap_or_default(),
        }
    }
}

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub parent: String,
    pub offset: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn first(parent: &str, page_size: usize) -> Self {
        Self {
            parent: parent.to_string(),
            offset: FIRST_OFFSET,
            page_size,
        }
    }

    /// The request for the following page. Advances by the page size, not by
    /// how many nodes the previous page actually held. Saturates at `usize::MAX`.
    pub fn next(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            offset: self.offset.saturating_add(self.page_size),
            page_size: self.page_size,
        }
    }

    /// Query parameters in the order the endpoint expects them.
    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("start", self.offset.to_string()),
            ("size", self.page_size.to_string()),
            ("code", self.parent.clone()),
        ]
    }
}

/// An exported vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Row {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number identifier, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_nested_page() {
        let body = r#"{
            "code": 200,
            "data": {
                "total": 2,
                "data": [
                    {"no": "1", "title": "A", "hasChild": "N"},
                    {"no": 2, "title": "B", "hasChild": "Y", "level": 1}
                ]
            }
        }"#;

        let envelope: CatalogEnvelope = serde_json::from_str(body).unwrap();
        let page = CatalogPage::from(envelope);

        assert_eq!(page.total, 2);
        assert_eq!(page.nodes[0], CatalogNode::new("1", "A", "N"));
        assert_eq!(page.nodes[1], CatalogNode::new("2", "B", "Y"));
    }

    #[test]
    fn test_null_node_list_is_empty() {
        let body = r#"{"data": {"total": 0, "data": null}}"#;
        let page = CatalogPage::from(serde_json::from_str::<CatalogEnvelope>(body).unwrap());
        assert!(page.nodes.is_empty());
    }

    #[test]
    fn test_missing_total_is_rejected() {
        let body = r#"{"data": {"data": []}}"#;
        assert!(serde_json::from_str::<CatalogEnvelope>(body).is_err());
    }

    #[test]
    fn test_child_flag_parse() {
        assert_eq!(ChildFlag::parse("Y"), ChildFlag::Yes);
        assert_eq!(ChildFlag::parse("N"), ChildFlag::No);
        assert_eq!(ChildFlag::parse(""), ChildFlag::Unknown);
        assert_eq!(ChildFlag::parse("n"), ChildFlag::Unknown);
    }

    #[test]
    fn test_page_request_advances_by_page_size() {
        let first = PageRequest::first("abc", 500);
        assert_eq!(first.offset, 1);
        assert_eq!(first.next().offset, 501);
        assert_eq!(first.next().next().offset, 1001);
        assert_eq!(first.next().parent, "abc");
    }

    #[test]
    fn test_page_request_offset_saturates() {
        let request = PageRequest::first("abc", usize::MAX);
        assert_eq!(request.next().offset, usize::MAX);
        assert_eq!(request.next().next().offset, usize::MAX);
    }

    #[test]
    fn test_query_parameter_order() {
        let request = PageRequest::first("", 500);
        let names: Vec<&str> = request.query().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["start", "size", "code"]);
    }

    #[test]
    fn test_row_serializes_with_name_header() {
        let json = serde_json::to_string(&Row::new("apple")).unwrap();
        assert_eq!(json, r#"{"Name":"apple"}"#);
    }
}
