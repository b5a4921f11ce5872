//! Text dictionary parser
//!
//! Reads the line-oriented dictionary format:
//!
//! ```text
//! # comment
//! ATTRIBUTE   User-Name        1     string
//! VALUE       Service-Type     Login-User   1
//! VENDOR      311              Microsoft
//! VENDORATTR  311  MS-CHAP-Challenge  11  octets
//! $INCLUDE    vendors.dict
//! ```
//!
//! Loading is best-effort: a malformed line is logged and skipped, and an
//! include that cannot be resolved or opened is logged and ignored. Only a
//! failure to open the top-level resource is reported to the caller.

use super::{AttributeType, Dictionary, DictionaryError, ValueKind};
use crate::attributes::codes::VENDOR_SPECIFIC;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Maximum `$INCLUDE` nesting before an include is skipped
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Locates and opens dictionary resources
pub trait ResourceResolver: Send + Sync {
    /// Resolve `next` relative to `current`, returning `None` when it does not exist
    fn resolve(&self, current: &str, next: &str) -> Option<String>;

    /// Open a resolved resource for reading
    fn open(&self, resource: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Resolves resources on the local filesystem, relative to the including file
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl ResourceResolver for FileResolver {
    fn resolve(&self, current: &str, next: &str) -> Option<String> {
        let path = match Path::new(current).parent() {
            Some(dir) => dir.join(next),
            None => PathBuf::from(next),
        };
        path.exists().then(|| path.to_string_lossy().into_owned())
    }

    fn open(&self, resource: &str) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(resource)?))
    }
}

/// Resolves resources from an in-memory set of named texts
///
/// Names are `/`-separated; relative includes are resolved against the
/// directory part of the including resource's name.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResolver {
    resources: HashMap<String, Cow<'static, str>>,
}

impl EmbeddedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver holding the dictionaries compiled into this crate
    pub fn builtin() -> Self {
        Self::new()
            .with_resource("radius.dict", include_str!("../../dictionaries/radius.dict"))
            .with_resource("vendors.dict", include_str!("../../dictionaries/vendors.dict"))
    }

    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        contents: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.resources.insert(name.into(), contents.into());
        self
    }
}

fn join_resource_name(current: &str, next: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !next.starts_with('/') {
        if let Some((dir, _)) = current.rsplit_once('/') {
            segments.extend(dir.split('/').filter(|s| !s.is_empty()));
        }
    }
    for segment in next.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

impl ResourceResolver for EmbeddedResolver {
    fn resolve(&self, current: &str, next: &str) -> Option<String> {
        let name = join_resource_name(current, next);
        self.resources.contains_key(&name).then_some(name)
    }

    fn open(&self, resource: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.resources.get(resource) {
            Some(contents) => Ok(Box::new(contents.as_bytes())),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("embedded resource not found: {}", resource),
            )),
        }
    }
}

/// Fills a [`Dictionary`] from text resources
pub struct DictionaryParser<R> {
    resolver: R,
}

impl<R: ResourceResolver> DictionaryParser<R> {
    pub fn new(resolver: R) -> Self {
        DictionaryParser { resolver }
    }

    /// Parse `resource` (and everything it includes) into a new dictionary
    pub fn parse(&self, resource: &str) -> Result<Dictionary, DictionaryError> {
        let mut dictionary = Dictionary::new();
        self.parse_into(&mut dictionary, resource)?;
        Ok(dictionary)
    }

    /// Parse `resource` into an existing dictionary
    pub fn parse_into(&self, dictionary: &mut Dictionary, resource: &str) -> Result<(), DictionaryError> {
        self.parse_resource(dictionary, resource, 0)
    }

    fn parse_resource(
        &self,
        dictionary: &mut Dictionary,
        resource: &str,
        depth: usize,
    ) -> Result<(), DictionaryError> {
        let mut contents = Vec::new();
        self.resolver
            .open(resource)
            .and_then(|mut reader| reader.read_to_end(&mut contents))
            .map_err(|source| DictionaryError::Io {
                resource: resource.to_string(),
                source,
            })?;

        let text = String::from_utf8_lossy(&contents);
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if let Err(e) = self.parse_line(dictionary, &tokens, resource, index + 1, depth) {
                warn!(
                    resource = resource,
                    line = index + 1,
                    error = %e,
                    "Skipping dictionary line"
                );
            }
        }

        debug!(resource = resource, types = dictionary.len(), "Parsed dictionary resource");
        Ok(())
    }

    fn parse_line(
        &self,
        dictionary: &mut Dictionary,
        tokens: &[&str],
        resource: &str,
        line: usize,
        depth: usize,
    ) -> Result<(), DictionaryError> {
        match tokens[0].to_ascii_uppercase().as_str() {
            "ATTRIBUTE" => {
                check_tokens("ATTRIBUTE", tokens, 4, resource, line)?;
                let code: u8 = parse_number(tokens[2])?;
                let kind = if code == VENDOR_SPECIFIC {
                    ValueKind::VendorSpecific
                } else {
                    ValueKind::from_type_name(tokens[3])
                };
                dictionary.add_attribute_type(AttributeType::new(code, tokens[1], kind))
            }
            "VALUE" => {
                check_tokens("VALUE", tokens, 4, resource, line)?;
                let value: u32 = parse_number(tokens[3])?;
                dictionary.add_enumeration_value(tokens[1], value, tokens[2])
            }
            "VENDORATTR" => {
                check_tokens("VENDORATTR", tokens, 5, resource, line)?;
                let vendor_id: u32 = parse_number(tokens[1])?;
                let code: u8 = parse_number(tokens[3])?;
                let kind = ValueKind::from_type_name(tokens[4]);
                dictionary.add_attribute_type(AttributeType::vendor(vendor_id, code, tokens[2], kind))
            }
            "VENDOR" => {
                check_tokens("VENDOR", tokens, 3, resource, line)?;
                let vendor_id: u32 = parse_number(tokens[1])?;
                dictionary.add_vendor(vendor_id, tokens[2])
            }
            "$INCLUDE" => {
                check_tokens("$INCLUDE", tokens, 2, resource, line)?;
                self.include(dictionary, resource, tokens[1], line, depth);
                Ok(())
            }
            other => {
                warn!(resource = resource, line = line, directive = other, "Unknown line type");
                Ok(())
            }
        }
    }

    fn include(&self, dictionary: &mut Dictionary, current: &str, next: &str, line: usize, depth: usize) {
        if depth >= MAX_INCLUDE_DEPTH {
            warn!(
                resource = current,
                line = line,
                include = next,
                "Include depth exceeded, skipping"
            );
            return;
        }

        let Some(resolved) = self.resolver.resolve(current, next) else {
            warn!(resource = current, line = line, include = next, "Included dictionary not found");
            return;
        };

        if let Err(e) = self.parse_resource(dictionary, &resolved, depth + 1) {
            warn!(resource = current, line = line, error = %e, "Failed to include dictionary");
        }
    }
}

fn check_tokens(
    directive: &'static str,
    tokens: &[&str],
    expected: usize,
    resource: &str,
    line: usize,
) -> Result<(), DictionaryError> {
    if tokens.len() < expected {
        return Err(DictionaryError::MissingToken {
            directive,
            expected,
            found: tokens.len(),
        });
    }
    if tokens.len() > expected {
        warn!(
            resource = resource,
            line = line,
            directive = directive,
            "Ignoring {} trailing token(s)",
            tokens.len() - expected
        );
    }
    Ok(())
}

fn parse_number<T: FromStr<Err = std::num::ParseIntError>>(token: &str) -> Result<T, DictionaryError> {
    token.parse().map_err(|source| DictionaryError::InvalidNumber {
        token: token.to_string(),
        source,
    })
}
