/// Package URIs and the member-name conventions built on them.
///
/// A PackURI is the absolute, slash-prefixed name of a part (`/ppt/slides/slide1.xml`).
/// The ZIP member name is the same string without the leading slash; every store in
/// the package is keyed by member name.
use crate::error::{Error, Result};

/// Absolute name of a part inside the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/presentation.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string that begins with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(Error::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a ZIP member name.
    pub fn from_member(member: &str) -> Self {
        PackURI {
            uri: format!("/{}", member.trim_start_matches('/')),
        }
    }

    /// Translate a relative reference (like "../slideLayouts/slideLayout1.xml") onto a
    /// base URI (like "/ppt/slides").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = Self::join_paths(base_uri, relative_ref);
        Self::new(Self::normalize_path(&joined))
    }

    /// Resolve a relationship target against the part that owns the relationship.
    ///
    /// Targets starting with `/` are package-absolute; anything else is relative to
    /// the owner's directory.
    pub fn resolve(owner: &PackURI, target: &str) -> Result<Self> {
        if target.starts_with('/') {
            Self::new(Self::normalize_path(target))
        } else {
            Self::from_rel_ref(owner.base_uri(), target)
        }
    }

    /// Directory of the part: `/ppt/slides` for `/ppt/slides/slide1.xml`, `/` at the root.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Last path segment.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the dot; empty when the name has none.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// ZIP member name: the URI without its leading slash.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Reference to this part as written in a relationship owned from `base_uri`.
    ///
    /// For example, "/ppt/slideLayouts/slideLayout1.xml" seen from "/ppt/slides" is
    /// "../slideLayouts/slideLayout1.xml".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|seg| !seg.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|seg| !seg.is_empty()).collect();
        let shared = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

        let mut out = "../".repeat(from.len() - shared);
        out.push_str(&to[shared..].join("/"));
        out
    }

    /// Relationships part of this part.
    ///
    /// For example, "/ppt/slides/_rels/slide1.xml.rels" for "/ppt/slides/slide1.xml",
    /// and "/_rels/.rels" for the package itself.
    pub fn rels_uri(&self) -> PackURI {
        let base_uri = self.base_uri();
        let uri = if base_uri == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base_uri, self.filename())
        };
        PackURI { uri }
    }

    /// Inverse of [`PackURI::rels_uri`]: the part a relationships part belongs to.
    ///
    /// Returns the package pseudo-partname "/" for "/_rels/.rels".
    pub fn rels_source(&self) -> PackURI {
        let filename = self.filename();
        let source_name = filename.strip_suffix(".rels").unwrap_or(filename);
        let dir = self.base_uri();
        let parent = dir.strip_suffix("/_rels").unwrap_or(dir);
        let uri = if parent.is_empty() || parent == "/" {
            format!("/{}", source_name)
        } else {
            format!("{}/{}", parent, source_name)
        };
        PackURI { uri }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Collapse "." and ".." segments; the result always starts with a slash.
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }
        format!("/{}", parts.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// Member name of the relationships part belonging to `member`.
pub fn rels_member_for(member: &str) -> String {
    PackURI::from_member(member).rels_uri().membername().to_string()
}

/// Resolve `target` from a relationship stored in `rels_member` into a member name.
pub fn resolve_rels_target(rels_member: &str, target: &str) -> Result<String> {
    let source = PackURI::from_member(rels_member).rels_source();
    Ok(PackURI::resolve(&source, target)?.membername().to_string())
}
