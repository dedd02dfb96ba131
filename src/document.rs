//! Document model and the in-memory document tree.
//!
//! A hardlink is a document that mirrors another node; its language and
//! country always come from the linked source. [`ResolvedDocument`] keeps
//! both nodes so callers read the right metadata through one accessor.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::request::RequestSource;

pub type DocumentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Page,
    Link,
    Hardlink,
    Snippet,
    Email,
    Folder,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::Page => "Page",
            DocumentType::Link => "Link",
            DocumentType::Hardlink => "Hardlink",
            DocumentType::Snippet => "Snippet",
            DocumentType::Email => "Email",
            DocumentType::Folder => "Folder",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(rename = "type", default)]
    pub kind: DocumentType,
    pub path: String,
    /// `language` property
    #[serde(default)]
    pub language: Option<String>,
    /// `country` property
    #[serde(default)]
    pub country: Option<String>,
    /// Target of a hardlink
    #[serde(default)]
    pub hardlink_source: Option<DocumentId>,
}

impl Document {
    pub fn page(id: DocumentId, path: impl Into<String>) -> Self {
        Self {
            id,
            kind: DocumentType::Page,
            path: path.into(),
            language: None,
            country: None,
            hardlink_source: None,
        }
    }

    pub fn hardlink(id: DocumentId, path: impl Into<String>, source: DocumentId) -> Self {
        Self {
            kind: DocumentType::Hardlink,
            hardlink_source: Some(source),
            ..Self::page(id, path)
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Language property; empty values count as unset.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref().filter(|l| !l.is_empty())
    }

    /// Country property; empty values count as unset.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().filter(|c| !c.is_empty())
    }
}

/// Target document of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDocument {
    Direct(Document),
    Aliased { wrapper: Document, source: Document },
}

impl ResolvedDocument {
    /// Id of the requested node (the hardlink itself when aliased).
    pub fn id(&self) -> DocumentId {
        self.requested().id
    }

    pub fn kind(&self) -> DocumentType {
        self.requested().kind
    }

    pub fn requested(&self) -> &Document {
        match self {
            ResolvedDocument::Direct(document) => document,
            ResolvedDocument::Aliased { wrapper, .. } => wrapper,
        }
    }

    /// Node whose metadata applies: the source when aliased.
    pub fn effective(&self) -> &Document {
        match self {
            ResolvedDocument::Direct(document) => document,
            ResolvedDocument::Aliased { source, .. } => source,
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.effective().language()
    }

    pub fn country(&self) -> Option<&str> {
        self.effective().country()
    }

    /// Language of the hardlink source, `None` for direct documents.
    pub fn hardlink_source_language(&self) -> Option<&str> {
        match self {
            ResolvedDocument::Direct(_) => None,
            ResolvedDocument::Aliased { source, .. } => source.language(),
        }
    }
}

/// Route name the router assigns to a document match.
pub fn document_route_name(id: DocumentId) -> String {
    format!("document_{}", id)
}

/// A document together with the route that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedDocument {
    pub document: ResolvedDocument,
    pub route_name: Option<String>,
    pub source: RequestSource,
    /// Locale the router derived for the request
    pub locale: Option<String>,
}

/// Read access to stored documents.
pub trait DocumentSource: Send + Sync {
    fn get(&self, id: DocumentId) -> Option<Document>;

    /// Linked source of a hardlink.
    fn source_of(&self, document: &Document) -> Option<Document> {
        document.hardlink_source.and_then(|id| self.get(id))
    }

    /// Wrap a document, dereferencing hardlinks.
    fn resolve_document(&self, document: Document) -> ResolvedDocument {
        if document.kind != DocumentType::Hardlink {
            return ResolvedDocument::Direct(document);
        }

        match self.source_of(&document) {
            Some(source) => ResolvedDocument::Aliased {
                wrapper: document,
                source,
            },
            None => {
                warn!("Hardlink {} has no resolvable source", document.id);
                ResolvedDocument::Direct(document)
            }
        }
    }
}

/// Maps a request to its target document.
pub trait DocumentResolver: Send + Sync {
    fn resolve(&self, host: &str, path: &str) -> Option<RoutedDocument>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRouteDefinition {
    pub name: String,
    pub pattern: String,
    pub document: DocumentId,
}

#[derive(Debug, Clone)]
struct StaticRoute {
    name: String,
    pattern: Regex,
    document: DocumentId,
}

/// Content of the documents definition file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsFile {
    pub documents: Vec<Document>,
    pub static_routes: Vec<StaticRouteDefinition>,
}

/// Document tree kept in memory, with static routes matched by regex.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentTree {
    documents: HashMap<DocumentId, Document>,
    paths: HashMap<String, DocumentId>,
    static_routes: Vec<StaticRoute>,
}

impl InMemoryDocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(file: DocumentsFile) -> Result<Self> {
        let mut tree = Self::new();
        for document in file.documents {
            tree.insert(document);
        }
        for route in file.static_routes {
            tree.add_static_route(&route.name, &route.pattern, route.document)
                .with_context(|| format!("Invalid pattern for static route {}", route.name))?;
        }
        Ok(tree)
    }

    /// Load documents and static routes from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read documents file {}", path.display()))?;
        let file: DocumentsFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse documents file {}", path.display()))?;

        let tree = Self::from_definitions(file)?;
        info!(
            "Loaded {} document(s) and {} static route(s) from {}",
            tree.documents.len(),
            tree.static_routes.len(),
            path.display()
        );
        Ok(tree)
    }

    pub fn insert(&mut self, document: Document) {
        self.paths.insert(normalize_path(&document.path), document.id);
        self.documents.insert(document.id, document);
    }

    /// Add a static route; the pattern must match the whole path.
    pub fn add_static_route(
        &mut self,
        name: &str,
        pattern: &str,
        document: DocumentId,
    ) -> Result<(), regex::Error> {
        let anchored = format!("^(?:{})$", pattern);
        self.static_routes.push(StaticRoute {
            name: name.to_string(),
            pattern: Regex::new(&anchored)?,
            document,
        });
        Ok(())
    }
}

impl DocumentSource for InMemoryDocumentTree {
    fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).cloned()
    }
}

impl DocumentResolver for InMemoryDocumentTree {
    fn resolve(&self, _host: &str, path: &str) -> Option<RoutedDocument> {
        let path = normalize_path(path);

        if let Some(document) = self.paths.get(&path).and_then(|id| self.get(*id)) {
            // the router derives the locale from the matched node itself
            let locale = document.language().map(str::to_string);
            let route_name = document_route_name(document.id);
            return Some(RoutedDocument {
                document: self.resolve_document(document),
                route_name: Some(route_name),
                source: RequestSource::Document,
                locale,
            });
        }

        let route = self.static_routes.iter().find(|r| r.pattern.is_match(&path))?;
        let document = self.resolve_document(self.get(route.document)?);
        let locale = document.language().map(str::to_string);
        Some(RoutedDocument {
            document,
            route_name: Some(route.name.clone()),
            source: RequestSource::StaticRoute,
            locale,
        })
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> InMemoryDocumentTree {
        let mut tree = InMemoryDocumentTree::new();
        tree.insert(Document::page(1, "/"));
        tree.insert(Document::page(2, "/en").with_language("en"));
        tree.insert(
            Document::page(3, "/de-ch")
                .with_language("de_CH")
                .with_country("ch"),
        );
        tree.insert(Document::hardlink(4, "/en-us", 2).with_language("fr"));
        tree.insert(Document::hardlink(5, "/broken", 99));
        tree.add_static_route("news_detail", r"/en/news/[a-z0-9-]+", 2)
            .expect("valid pattern");
        tree
    }

    // ==================== Resolved Document Tests ====================

    #[test]
    fn test_direct_document_metadata() {
        let tree = tree();
        let routed = tree.resolve("example.com", "/de-ch/").expect("document");

        assert!(matches!(routed.document, ResolvedDocument::Direct(_)));
        assert_eq!(routed.document.id(), 3);
        assert_eq!(routed.document.language(), Some("de_CH"));
        assert_eq!(routed.document.country(), Some("ch"));
        assert_eq!(routed.route_name.as_deref(), Some("document_3"));
        assert_eq!(routed.source, RequestSource::Document);
        assert_eq!(routed.locale.as_deref(), Some("de_CH"));
    }

    #[test]
    fn test_hardlink_reads_source_metadata() {
        let tree = tree();
        let routed = tree.resolve("example.com", "/en-us").expect("document");

        assert!(matches!(routed.document, ResolvedDocument::Aliased { .. }));
        assert_eq!(routed.document.id(), 4);
        assert_eq!(routed.document.kind(), DocumentType::Hardlink);
        assert_eq!(routed.document.language(), Some("en"));
        assert_eq!(routed.document.hardlink_source_language(), Some("en"));
        // the router took the wrapper's own property
        assert_eq!(routed.locale.as_deref(), Some("fr"));
    }

    #[test]
    fn test_hardlink_without_source_stays_direct() {
        let tree = tree();
        let routed = tree.resolve("example.com", "/broken").expect("document");
        assert!(matches!(routed.document, ResolvedDocument::Direct(_)));
        assert_eq!(routed.document.language(), None);
    }

    #[test]
    fn test_empty_properties_count_as_unset() {
        let document = Document::page(9, "/x").with_language("").with_country("");
        assert_eq!(document.language(), None);
        assert_eq!(document.country(), None);
    }

    // ==================== Routing Tests ====================

    #[test]
    fn test_root_path() {
        let tree = tree();
        let routed = tree.resolve("example.com", "/").expect("root");
        assert_eq!(routed.document.id(), 1);
        assert_eq!(routed.locale, None);
    }

    #[test]
    fn test_static_route_match() {
        let tree = tree();
        let routed = tree
            .resolve("example.com", "/en/news/hello-world")
            .expect("static route");

        assert_eq!(routed.source, RequestSource::StaticRoute);
        assert_eq!(routed.route_name.as_deref(), Some("news_detail"));
        assert_eq!(routed.document.id(), 2);
    }

    #[test]
    fn test_static_route_is_anchored() {
        let tree = tree();
        assert!(tree.resolve("example.com", "/x/en/news/a").is_none());
        assert!(tree.resolve("example.com", "/missing").is_none());
    }

    #[test]
    fn test_from_definitions_rejects_bad_pattern() {
        let file = DocumentsFile {
            documents: vec![Document::page(1, "/")],
            static_routes: vec![StaticRouteDefinition {
                name: "broken".to_string(),
                pattern: "(".to_string(),
                document: 1,
            }],
        };
        let result = InMemoryDocumentTree::from_definitions(file);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("broken"));
    }

    #[test]
    fn test_documents_file_json() {
        let file: DocumentsFile = serde_json::from_str(
            r#"{
                "documents": [
                    { "id": 1, "path": "/" },
                    { "id": 7, "type": "hardlink", "path": "/fr-ch", "hardlink_source": 1 }
                ]
            }"#,
        )
        .expect("valid json");

        assert_eq!(file.documents[0].kind, DocumentType::Page);
        assert_eq!(file.documents[1].kind, DocumentType::Hardlink);
        assert_eq!(file.documents[1].hardlink_source, Some(1));
        assert!(file.static_routes.is_empty());
    }
}
