//! Content-fingerprint change detection.
//!
//! The modified selector computes a fingerprint for every candidate file and
//! compares it with the value stored in a cache from an earlier run. A file
//! is selected when the values differ (or none was stored).
//!
//! Selection has a side effect: with `update` enabled (the default) every
//! changed value is written back into the cache, so evaluating the same
//! tree twice selects everything the first time and nothing the second.
//! With `delayupdate` (also the default) the cache is persisted once per
//! scan, when the scan finishes; [`ModifiedSelector::save_cache`] persists
//! it explicitly. Failing to persist the cache is logged, not fatal.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use digest::Digest;
use tracing::{debug, warn};

use crate::error::SelectError;
use crate::project::Project;
use crate::resource::Resource;

use super::custom::{to_boolean, ExtendSelector, Parameter};
use super::{illegal_value, Candidate, FileSelector};

/// Default cache file name, relative to the project base directory.
pub const DEFAULT_CACHE_FILE: &str = "cache.properties";

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Persistent key/value store for fingerprints.
pub trait ValueCache: fmt::Debug {
    /// Whether the cache is configured well enough to be used.
    fn is_valid(&self) -> bool;

    fn get(&self, key: &str) -> Option<String>;

    fn put(&mut self, key: &str, value: String);

    /// All stored keys, sorted.
    fn keys(&self) -> Vec<String>;

    /// Forget every value and remove any persisted copy.
    fn delete(&mut self) -> Result<(), SelectError>;

    fn load(&mut self) -> Result<(), SelectError>;

    fn save(&mut self) -> Result<(), SelectError>;
}

/// A cache that lives as long as the selector.
#[derive(Debug, Default)]
pub struct MemoryCache {
    values: BTreeMap<String, String>,
}

impl ValueCache for MemoryCache {
    fn is_valid(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn delete(&mut self) -> Result<(), SelectError> {
        self.values.clear();
        Ok(())
    }

    fn load(&mut self) -> Result<(), SelectError> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), SelectError> {
        Ok(())
    }
}

/// A cache persisted as a `key=value` properties file.
#[derive(Debug, Default)]
pub struct PropertiesCache {
    file: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl PropertiesCache {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            values: BTreeMap::new(),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

impl ValueCache for PropertiesCache {
    fn is_valid(&self) -> bool {
        self.file.is_some()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn delete(&mut self) -> Result<(), SelectError> {
        self.values.clear();
        if let Some(file) = &self.file {
            if file.exists() {
                std::fs::remove_file(file).map_err(|e| SelectError::io(file, e))?;
            }
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), SelectError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if !file.exists() {
            return Ok(());
        }
        let text = std::fs::read_to_string(file).map_err(|e| SelectError::io(file, e))?;
        self.values = parse_properties(&text);
        Ok(())
    }

    fn save(&mut self) -> Result<(), SelectError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SelectError::io(parent, e))?;
            }
        }
        std::fs::write(file, format_properties(&self.values)).map_err(|e| SelectError::io(file, e))
    }
}

fn escape_property(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_property(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

pub(crate) fn format_properties(values: &BTreeMap<String, String>) -> String {
    let mut out = String::from("# modified selector cache\n");
    for (k, v) in values {
        out.push_str(&escape_property(k, true));
        out.push('=');
        out.push_str(&escape_property(v, false));
        out.push('\n');
    }
    out
}

pub(crate) fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let mut split = None;
        let mut escaped = false;
        for (i, c) in line.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '=' | ':' => {
                    split = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let (key, value) = match split {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };
        values.insert(
            unescape_property(key.trim_end()),
            unescape_property(value.trim_start()),
        );
    }
    values
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    PropertyFile,
    Memory,
}

impl FromStr for CacheKind {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propertyfile" => Ok(Self::PropertyFile),
            "memory" => Ok(Self::Memory),
            _ => Err(illegal_value(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// Computes the value stored in the cache for a resource.
pub trait Fingerprint: fmt::Debug {
    fn value(&self, resource: &Resource) -> Result<String, SelectError>;
}

/// Signed 32-bit polynomial hash (base 31) over the UTF-16 units of the
/// content, as a decimal string.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashValue;

impl HashValue {
    pub fn of(content: &[u8]) -> String {
        let text = String::from_utf8_lossy(content);
        let hash = text
            .encode_utf16()
            .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(i32::from(c)));
        hash.to_string()
    }
}

impl Fingerprint for HashValue {
    fn value(&self, resource: &Resource) -> Result<String, SelectError> {
        Ok(Self::of(&resource.read_content()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha1,
    Sha256,
}

impl FromStr for DigestAlgorithm {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA" | "SHA1" | "SHA-1" => Ok(Self::Sha1),
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            _ => Err(illegal_value(s)),
        }
    }
}

fn hex_digest<D: Digest>(content: &[u8]) -> String {
    hex::encode(D::digest(content))
}

impl DigestAlgorithm {
    /// Lowercase hex digest of `content`.
    pub fn of(self, content: &[u8]) -> String {
        match self {
            Self::Md5 => hex_digest::<md5::Md5>(content),
            Self::Sha1 => hex_digest::<sha1::Sha1>(content),
            Self::Sha256 => hex_digest::<sha2::Sha256>(content),
        }
    }
}

impl Fingerprint for DigestAlgorithm {
    fn value(&self, resource: &Resource) -> Result<String, SelectError> {
        Ok(self.of(&resource.read_content()?))
    }
}

/// 32-bit checksums, rendered as unsigned decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    #[default]
    Crc32,
    Adler32,
}

impl FromStr for ChecksumAlgorithm {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRC" | "CRC32" => Ok(Self::Crc32),
            "ADLER" | "ADLER32" => Ok(Self::Adler32),
            _ => Err(illegal_value(s)),
        }
    }
}

impl ChecksumAlgorithm {
    pub fn of(self, content: &[u8]) -> String {
        let sum = match self {
            Self::Crc32 => crc32fast::hash(content),
            Self::Adler32 => adler::adler32_slice(content),
        };
        sum.to_string()
    }
}

impl Fingerprint for ChecksumAlgorithm {
    fn value(&self, resource: &Resource) -> Result<String, SelectError> {
        Ok(self.of(&resource.read_content()?))
    }
}

/// The modification time in milliseconds; content is never read.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastModified;

impl Fingerprint for LastModified {
    fn value(&self, resource: &Resource) -> Result<String, SelectError> {
        Ok(resource.last_modified_millis().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Digest,
    HashValue,
    Checksum,
    LastModified,
}

impl FromStr for Algorithm {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(Self::Digest),
            "hashvalue" => Ok(Self::HashValue),
            "checksum" => Ok(Self::Checksum),
            "lastmodified" => Ok(Self::LastModified),
            _ => Err(illegal_value(s)),
        }
    }
}

/// How a stored value is compared with a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparatorKind {
    /// Exact string equality.
    #[default]
    Equal,
    /// Collation-style equality: case and surrounding whitespace ignored.
    Rule,
}

impl ComparatorKind {
    fn same(self, old: &str, new: &str) -> bool {
        match self {
            Self::Equal => old == new,
            Self::Rule => old.trim().to_lowercase() == new.trim().to_lowercase(),
        }
    }
}

impl FromStr for ComparatorKind {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "rule" => Ok(Self::Rule),
            _ => Err(illegal_value(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// ModifiedSelector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Settings {
    cache: CacheKind,
    cache_file: Option<PathBuf>,
    algorithm: Algorithm,
    digest: DigestAlgorithm,
    checksum: ChecksumAlgorithm,
    /// `algorithm.algorithm`, read by whichever algorithm is selected.
    algorithm_detail: Option<String>,
    comparator: ComparatorKind,
    update: bool,
    select_dirs: bool,
    delay_update: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: CacheKind::PropertyFile,
            cache_file: None,
            algorithm: Algorithm::Digest,
            digest: DigestAlgorithm::Md5,
            checksum: ChecksumAlgorithm::Crc32,
            algorithm_detail: None,
            comparator: ComparatorKind::Equal,
            update: true,
            select_dirs: true,
            delay_update: true,
        }
    }
}

impl Settings {
    fn apply(&mut self, param: &Parameter) -> Result<(), SelectError> {
        let value = param.value.as_str();
        match param.name.as_str() {
            "cache" => self.cache = value.parse()?,
            "algorithm" => self.algorithm = value.parse()?,
            "comparator" => self.comparator = value.parse()?,
            "update" => self.update = to_boolean(value),
            "seldirs" => self.select_dirs = to_boolean(value),
            "delayupdate" => self.delay_update = to_boolean(value),
            "cache.cachefile" => self.cache_file = Some(PathBuf::from(value)),
            "algorithm.algorithm" => self.algorithm_detail = Some(value.to_string()),
            other => {
                return Err(SelectError::Validation(format!("Invalid parameter {other}")));
            }
        }
        Ok(())
    }

    /// Apply `algorithm.algorithm` once the algorithm itself is known.
    fn resolve_detail(&mut self) -> Result<(), SelectError> {
        let Some(detail) = self.algorithm_detail.take() else {
            return Ok(());
        };
        match self.algorithm {
            Algorithm::Digest => self.digest = detail.parse()?,
            Algorithm::Checksum => self.checksum = detail.parse()?,
            Algorithm::HashValue | Algorithm::LastModified => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ModifiedState {
    cache: Option<Box<dyn ValueCache>>,
    pending: usize,
}

/// Selects files whose content fingerprint differs from the cached one.
///
/// Clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct ModifiedSelector {
    settings: Settings,
    params: Vec<Parameter>,
    fingerprint: Option<Rc<dyn Fingerprint>>,
    state: Rc<RefCell<ModifiedState>>,
}

impl ModifiedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cache(&mut self, kind: &str) -> Result<(), SelectError> {
        self.settings.cache = kind.parse()?;
        Ok(())
    }

    pub fn set_cache_file(&mut self, file: impl Into<PathBuf>) {
        self.settings.cache_file = Some(file.into());
    }

    pub fn set_algorithm(&mut self, algorithm: &str) -> Result<(), SelectError> {
        self.settings.algorithm = algorithm.parse()?;
        Ok(())
    }

    pub fn set_digest(&mut self, digest: &str) -> Result<(), SelectError> {
        self.settings.digest = digest.parse()?;
        Ok(())
    }

    /// `CRC` or `ADLER`, used by the `checksum` algorithm.
    pub fn set_checksum(&mut self, checksum: &str) -> Result<(), SelectError> {
        self.settings.checksum = checksum.parse()?;
        Ok(())
    }

    pub fn set_comparator(&mut self, comparator: &str) -> Result<(), SelectError> {
        self.settings.comparator = comparator.parse()?;
        Ok(())
    }

    /// Write changed values back into the cache (default `true`).
    pub fn set_update(&mut self, update: bool) {
        self.settings.update = update;
    }

    /// What to answer for directories (default `true`).
    pub fn set_select_dirs(&mut self, select: bool) {
        self.settings.select_dirs = select;
    }

    /// Persist once per scan instead of after every change (default `true`).
    pub fn set_delay_update(&mut self, delay: bool) {
        self.settings.delay_update = delay;
    }

    /// Generic `name=value` configuration, applied on first use.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push(Parameter::new(name, value));
    }

    /// Use a caller-supplied cache instead of the configured kind.
    pub fn use_cache(&mut self, cache: Box<dyn ValueCache>) {
        self.state.borrow_mut().cache = Some(cache);
    }

    /// Use a caller-supplied fingerprint instead of the configured algorithm.
    pub fn use_fingerprint(&mut self, fingerprint: Rc<dyn Fingerprint>) {
        self.fingerprint = Some(fingerprint);
    }

    fn effective_settings(&self) -> Result<Settings, SelectError> {
        let mut settings = self.settings.clone();
        for param in &self.params {
            settings.apply(param)?;
        }
        settings.resolve_detail()?;
        Ok(settings)
    }

    fn fingerprint_for(&self, settings: &Settings) -> Rc<dyn Fingerprint> {
        if let Some(f) = &self.fingerprint {
            return Rc::clone(f);
        }
        match settings.algorithm {
            Algorithm::HashValue => Rc::new(HashValue),
            Algorithm::Digest => Rc::new(settings.digest),
            Algorithm::Checksum => Rc::new(settings.checksum),
            Algorithm::LastModified => Rc::new(LastModified),
        }
    }

    /// Build and load the cache on first use.
    fn ensure_cache(&self, project: &Project, settings: &Settings) -> Result<(), SelectError> {
        let mut state = self.state.borrow_mut();
        if state.cache.is_none() {
            let mut cache: Box<dyn ValueCache> = match settings.cache {
                CacheKind::Memory => Box::new(MemoryCache::default()),
                CacheKind::PropertyFile => {
                    let file = settings
                        .cache_file
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE));
                    Box::new(PropertiesCache::new(project.resolve_file(file)))
                }
            };
            cache.load()?;
            state.cache = Some(cache);
        }
        match &state.cache {
            Some(cache) if cache.is_valid() => Ok(()),
            _ => Err(SelectError::Validation(
                "Cache must be proper configured.".into(),
            )),
        }
    }

    /// Persist pending cache changes. Failures are logged.
    pub fn save_cache(&self) {
        let mut state = self.state.borrow_mut();
        if state.pending == 0 {
            return;
        }
        let pending = state.pending;
        state.pending = 0;
        if let Some(cache) = state.cache.as_mut() {
            match cache.save() {
                Ok(()) => debug!(changed = pending, "modified selector cache saved"),
                Err(e) => warn!(error = %e, "could not save modified selector cache"),
            }
        }
    }

    /// The cached value for `key` (a resource's long string).
    pub fn cached_value(&self, key: &str) -> Option<String> {
        self.state
            .borrow()
            .cache
            .as_ref()
            .and_then(|c| c.get(key))
    }

    /// Keys currently held in the cache.
    pub fn cached_keys(&self) -> Vec<String> {
        self.state
            .borrow()
            .cache
            .as_ref()
            .map(|c| c.keys())
            .unwrap_or_default()
    }

    /// Forget all cached values and remove the cache file, if any.
    pub fn delete_cache(&self) -> Result<(), SelectError> {
        let mut state = self.state.borrow_mut();
        state.pending = 0;
        match state.cache.as_mut() {
            Some(cache) => cache.delete(),
            None => Ok(()),
        }
    }
}

impl FileSelector for ModifiedSelector {
    fn is_selected(&self, project: &Project, candidate: &Candidate<'_>) -> Result<bool, SelectError> {
        let settings = self.effective_settings()?;
        self.ensure_cache(project, &settings)?;

        let resource = candidate.resource;
        if resource.is_directory() {
            return Ok(settings.select_dirs);
        }

        let fresh = self.fingerprint_for(&settings).value(resource)?;
        let key = resource.to_long_string();

        let changed = {
            let state = self.state.borrow();
            let cached = state.cache.as_ref().and_then(|c| c.get(&key));
            !cached.is_some_and(|old| settings.comparator.same(&old, &fresh))
        };

        if settings.update && changed {
            {
                let mut state = self.state.borrow_mut();
                if let Some(cache) = state.cache.as_mut() {
                    cache.put(&key, fresh);
                }
                state.pending += 1;
            }
            if !settings.delay_update {
                self.save_cache();
            }
        }
        Ok(changed)
    }
}

impl ExtendSelector for ModifiedSelector {
    fn set_parameters(&mut self, params: &[Parameter]) -> Result<(), SelectError> {
        self.params.extend_from_slice(params);
        Ok(())
    }

    fn scan_finished(&self, _project: &Project) {
        self.save_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_value_matches_java_string_hash() {
        assert_eq!(HashValue::of(b""), "0");
        assert_eq!(HashValue::of(b"a"), "97");
        assert_eq!(HashValue::of(b"hello"), "99162322");
    }

    #[test]
    fn digests_are_lowercase_hex() {
        assert_eq!(
            DigestAlgorithm::Md5.of(b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            DigestAlgorithm::Sha1.of(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn checksums_are_unsigned_decimal() {
        assert_eq!(ChecksumAlgorithm::Crc32.of(b"123456789"), "3421780262");
        assert_eq!(ChecksumAlgorithm::Adler32.of(b"Wikipedia"), "300286872");
        assert_eq!("adler".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Adler32);
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn algorithm_detail_follows_the_algorithm() {
        let mut s = ModifiedSelector::new();
        s.add_param("algorithm.algorithm", "adler");
        s.add_param("algorithm", "checksum");
        let settings = s.effective_settings().unwrap();
        assert_eq!(settings.checksum, ChecksumAlgorithm::Adler32);
        assert_eq!(settings.digest, DigestAlgorithm::Md5);

        let mut s = ModifiedSelector::new();
        s.add_param("algorithm.algorithm", "SHA-256");
        assert_eq!(s.effective_settings().unwrap().digest, DigestAlgorithm::Sha256);

        let mut s = ModifiedSelector::new();
        s.add_param("algorithm", "checksum");
        s.add_param("algorithm.algorithm", "SHA-256");
        assert!(s.effective_settings().is_err());
    }

    #[test]
    fn properties_escape_separators_in_keys() {
        let mut values = BTreeMap::new();
        values.insert("C:\\dir\\a b=c".to_string(), "v1".to_string());
        let text = format_properties(&values);
        assert!(text.contains("C\\:\\\\dir\\\\a\\ b\\=c=v1"));
        assert_eq!(parse_properties(&text), values);
    }

    #[test]
    fn properties_skip_comments_and_accept_colon() {
        let values = parse_properties("# c\n! c\n\nk1 = v1\nk2:v2\n");
        assert_eq!(values.get("k1").map(String::as_str), Some("v1"));
        assert_eq!(values.get("k2").map(String::as_str), Some("v2"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn unknown_parameter_fails_on_use() {
        let mut s = ModifiedSelector::new();
        s.add_param("colour", "blue");
        let err = s.effective_settings().unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter colour");
    }

    #[test]
    fn rule_comparator_ignores_case() {
        assert!(ComparatorKind::Rule.same("ABC", "abc"));
        assert!(!ComparatorKind::Equal.same("ABC", "abc"));
    }
}
