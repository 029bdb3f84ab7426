//! Parses, validates, and renders repository references of shape
//! `registry[:port]/repository[:tag|@digest]`.
//!
//! Every URL the client builds is derived from a [`Reference`]. Unlike a
//! Docker Hub client, this parser performs no registry-specific rewriting of
//! the repository path (no implicit `library/` prefix) — the only special
//! case is that the registry host `docker.io` resolves to `registry-1.docker.io`
//! for the purpose of building URLs, per the distribution protocol's own
//! convention.

use crate::digest::Digest;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[cfg(test)]
mod tests;

fn repository_component_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").unwrap())
}

fn registry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?(?::[0-9]+)?$").unwrap()
    })
}

/// The parsed "reference" portion of a repository reference: a tag, a
/// digest, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Locator {
    None,
    Tag(String),
    Digest(Digest),
}

/// A parsed, validated repository reference.
///
/// Rendering via [`Display`](fmt::Display) always reproduces the canonical
/// form: `repo@digest` when the reference is a digest, `repo:tag` when it's
/// a tag, `repo` alone when empty. Parsing is always the left inverse of
/// display for any reference this type accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    registry: String,
    repository: String,
    locator: Locator,
}

impl Reference {
    /// The registry host (and optional port) as written in the input.
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// The host to use when building request URLs: `docker.io` is mapped to
    /// `registry-1.docker.io`, everything else is passed through unchanged.
    pub fn url_host(&self) -> &str {
        canonical_host(&self.registry)
    }

    /// The repository path, e.g. `"library/nginx"`.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The tag, if the reference carries one (a digest never also has a tag:
    /// parsing discards the tag when both are present).
    pub fn tag(&self) -> Option<&str> {
        match &self.locator {
            Locator::Tag(t) => Some(t),
            _ => None,
        }
    }

    /// The digest, if the reference carries one.
    pub fn digest(&self) -> Option<&Digest> {
        match &self.locator {
            Locator::Digest(d) => Some(d),
            _ => None,
        }
    }

    /// `true` if neither a tag nor a digest is present.
    pub fn is_empty_locator(&self) -> bool {
        matches!(self.locator, Locator::None)
    }

    /// Returns a copy of this reference with its tag-or-digest portion
    /// replaced, used by [`parse_list`] to expand the shared-base list form.
    fn with_locator(&self, locator: Locator) -> Self {
        Reference {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            locator,
        }
    }

}

/// `docker.io` is the one registry host this crate rewrites for URL-building
/// purposes, per the distribution protocol's own Docker Hub convention.
/// Shared by [`Reference::url_host`] and the [`crate::registry`] client,
/// which builds registry-level URLs without a full [`Reference`].
pub fn canonical_host(host: &str) -> &str {
    if host == "docker.io" {
        "registry-1.docker.io"
    } else {
        host
    }
}

/// Validates a repository path component against the grammar in §3: `a-z0-9`
/// segments joined by `/`, separators `.`, `_`, `__`, `-*`. Exposed crate-wide
/// so [`crate::registry::Registry::repository`] can validate a bare
/// repository name the same way the full parser does.
pub(crate) fn validate_repository(repository: &str) -> Result<()> {
    if repository.is_empty() || !repository.split('/').all(|c| repository_component_re().is_match(c)) {
        return Err(Error::invalid_reference(repository, "invalid repository path"));
    }
    Ok(())
}

/// Validates a registry host[:port] component. Exposed crate-wide so
/// [`crate::registry::Registry::new`] can validate its host the same way the
/// full parser does.
pub(crate) fn validate_registry(registry: &str) -> Result<()> {
    if registry.is_empty() || !registry_re().is_match(registry) {
        return Err(Error::invalid_reference(registry, "invalid registry host"));
    }
    Ok(())
}

/// Splits the path component (everything after the registry's `/`) into
/// `(repository, locator)` per §4.1: the first `@` (if any) separates a
/// digest, with the *first* `:` in the remaining left-hand side (if any)
/// discarded as a superseded tag; otherwise the first `:` separates a tag;
/// otherwise the whole path is the repository and the locator is empty.
fn split_path(path: &str) -> Result<(&str, Locator)> {
    if let Some(at) = path.find('@') {
        let left = &path[..at];
        let digest_str = &path[at + 1..];
        let repository = match left.find(':') {
            Some(colon) => &left[..colon],
            None => left,
        };
        let digest = Digest::from_str(digest_str).map_err(|_| Error::invalid_reference(path, "invalid digest"))?;
        return Ok((repository, Locator::Digest(digest)));
    }
    if let Some(colon) = path.find(':') {
        let repository = &path[..colon];
        let tag = &path[colon + 1..];
        if !tag_re().is_match(tag) {
            return Err(Error::invalid_reference(path, "invalid tag"));
        }
        return Ok((repository, Locator::Tag(tag.to_string())));
    }
    Ok((path, Locator::None))
}

/// Like [`split_path`], but for the list form (§4.1), where the portion
/// after the repository is a comma-separated list of tags or digests rather
/// than a single locator: splits off the repository (discarding a
/// superseded tag before `@`, same as [`split_path`]) and returns the raw,
/// un-parsed reference-list text plus whether it names digests or tags.
fn split_path_list(path: &str) -> (&str, &str, bool) {
    if let Some(at) = path.find('@') {
        let left = &path[..at];
        let repository = match left.find(':') {
            Some(colon) => &left[..colon],
            None => left,
        };
        (repository, &path[at + 1..], true)
    } else if let Some(colon) = path.find(':') {
        (&path[..colon], &path[colon + 1..], false)
    } else {
        (path, "", false)
    }
}

impl FromStr for Reference {
    type Err = Error;

    /// Parses `registry[:port]/repository[:tag|@digest]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use orex::reference::Reference;
    /// use std::str::FromStr;
    ///
    /// let r = Reference::from_str("localhost:5000/hello-world:v1").unwrap();
    /// assert_eq!(r.registry(), "localhost:5000");
    /// assert_eq!(r.repository(), "hello-world");
    /// assert_eq!(r.tag(), Some("v1"));
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let (registry, path) = s
            .split_once('/')
            .ok_or_else(|| Error::invalid_reference(s, "missing '/' separating registry from repository"))?;
        validate_registry(registry)?;

        let (repository, locator) = split_path(path)?;
        validate_repository(repository)?;

        Ok(Reference {
            registry: registry.to_string(),
            repository: repository.to_string(),
            locator,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        match &self.locator {
            Locator::None => Ok(()),
            Locator::Tag(t) => write!(f, ":{t}"),
            Locator::Digest(d) => write!(f, "@{d}"),
        }
    }
}

/// Expands the list form `registry/repo:t1,t2,…` or `registry/repo@d1,d2,…`
/// into a sequence of references sharing the same registry and repository.
///
/// # Examples
///
/// ```
/// use orex::reference::parse_list;
///
/// let refs = parse_list("ghcr.io/org/repo:v1,v2").unwrap();
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].tag(), Some("v1"));
/// assert_eq!(refs[1].tag(), Some("v2"));
/// ```
pub fn parse_list(s: &str) -> Result<Vec<Reference>> {
    let (registry, path) = s
        .split_once('/')
        .ok_or_else(|| Error::invalid_reference(s, "missing '/' separating registry from repository"))?;
    validate_registry(registry)?;

    let (repository, path_reference, is_digest_list) = split_path_list(path);
    validate_repository(repository)?;

    if path_reference.is_empty() {
        let single = Reference {
            registry: registry.to_string(),
            repository: repository.to_string(),
            locator: Locator::None,
        };
        return Ok(vec![single]);
    }

    let base = Reference {
        registry: registry.to_string(),
        repository: repository.to_string(),
        locator: Locator::None,
    };

    path_reference
        .split(',')
        .map(|item| {
            let locator = if is_digest_list {
                Digest::from_str(item)
                    .map(Locator::Digest)
                    .map_err(|_| Error::invalid_reference(item, "invalid digest in list form"))?
            } else {
                if !tag_re().is_match(item) {
                    return Err(Error::invalid_reference(item, "invalid tag in list form"));
                }
                Locator::Tag(item.to_string())
            };
            Ok(base.with_locator(locator))
        })
        .collect()
}
