//! Licensed component metadata.
//!
//! A [`ComponentInfo`] describes a licensed component the way the host
//! knows it: name, version, product, strong-name public key and embedded
//! resources. It is built directly or read from a manifest without running
//! any component code.

mod manifest;

use crate::crypto::rsa::RsaKey;
use crate::crypto::{digest, snk};
use crate::LicentiaError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Four-part component version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Build number; days since 2000-01-01 for stamped builds.
    pub build: u32,
    /// Revision.
    pub revision: u32,
}

impl Version {
    /// Create a version.
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Release date encoded in the build number: 2000-01-01 plus `build`
    /// days.
    pub fn release_date(&self) -> DateTime<Utc> {
        let epoch = Utc
            .with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        epoch
            .checked_add_signed(Duration::days(i64::from(self.build)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `major.minor`.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for Version {
    type Err = LicentiaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(LicentiaError::ConfigError(format!("Invalid version: {:?}", s)));
        }
        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| LicentiaError::ConfigError(format!("Invalid version: {:?}", s)))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Stable identity of a component, used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(String);

impl ComponentId {
    /// Identity text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A license item a component declares it may ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredItem {
    /// Item name.
    pub name: String,
    /// Description shown to users.
    #[serde(default)]
    pub description: String,
}

/// A named resource carried by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    /// Resource name.
    pub name: String,
    /// Resource bytes.
    pub content: Vec<u8>,
}

/// Supplies licenses for other components on behalf of the component that
/// carries it, replacing the embedded resource lookup for that carrier.
///
/// Any `Fn(&ComponentInfo) -> Option<String>` closure is a loader.
pub trait LicenseLoader: Send + Sync {
    /// License text for `component`, or `None` when this carrier has none.
    fn load(&self, component: &ComponentInfo) -> Option<String>;
}

impl<F> LicenseLoader for F
where
    F: Fn(&ComponentInfo) -> Option<String> + Send + Sync,
{
    fn load(&self, component: &ComponentInfo) -> Option<String> {
        self(component)
    }
}

impl fmt::Debug for dyn LicenseLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LicenseLoader")
    }
}

/// Metadata of a licensed component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    name: String,
    version: Version,
    file_version: Option<Version>,
    product: Option<String>,
    public_key_blob: Option<Vec<u8>>,
    public_key_token: String,
    license_public_key_xml: Option<String>,
    content_hash: String,
    license_items: Vec<DeclaredItem>,
    resources: Vec<EmbeddedResource>,
    license_loader: Option<Arc<dyn LicenseLoader>>,
    location: Option<PathBuf>,
}

impl ComponentInfo {
    /// Unsigned component with the given name and version.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        let name = name.into();
        let content_hash = digest::sha256_b64(name.as_bytes());
        Self {
            name,
            version,
            file_version: None,
            product: None,
            public_key_blob: None,
            public_key_token: String::new(),
            license_public_key_xml: None,
            content_hash,
            license_items: Vec::new(),
            resources: Vec::new(),
            license_loader: None,
            location: None,
        }
    }

    /// Sign the component with a strong-name key (public blob or key pair).
    pub fn with_strong_name(mut self, blob: &[u8]) -> Result<Self, LicentiaError> {
        let key = snk::public_key_from_blob(blob)?;
        let public_blob = snk::public_blob(&key)?;
        self.public_key_token = snk::public_key_token(&public_blob);
        self.public_key_blob = Some(public_blob);
        Ok(self)
    }

    /// Declare the product this component belongs to.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Set the file version.
    pub fn with_file_version(mut self, version: Version) -> Self {
        self.file_version = Some(version);
        self
    }

    /// Use a dedicated license verification key instead of the strong-name
    /// key.
    pub fn with_license_public_key(mut self, xml: impl Into<String>) -> Self {
        self.license_public_key_xml = Some(xml.into());
        self
    }

    /// Set the content hash from the component's bytes.
    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.content_hash = digest::sha256_b64(content);
        self
    }

    /// Declare a license item.
    pub fn with_license_item(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.license_items.push(DeclaredItem {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Attach an embedded resource.
    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.resources.push(EmbeddedResource {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    /// Supply licenses carried by this component through `loader` instead
    /// of its embedded resources.
    pub fn with_license_loader(mut self, loader: impl LicenseLoader + 'static) -> Self {
        self.license_loader = Some(Arc::new(loader));
        self
    }

    /// Record where the component lives on disk.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Read a component manifest.
    ///
    /// Manifest fields: `name`, `version`, optional `fileVersion`,
    /// `product`, `publicKey` (base64 blob) or `publicKeyFile`,
    /// `licensePublicKey` (XML), `artifact` (hashed, becomes the location),
    /// `licenseItems` and `resources` (`name` + `file`). Relative paths are
    /// resolved against the manifest directory.
    pub fn read_manifest(path: impl AsRef<Path>) -> Result<Self, LicentiaError> {
        manifest::read(path.as_ref())
    }

    /// Identity used for caching and diagnostics.
    pub fn id(&self) -> ComponentId {
        let token = if self.is_signed() {
            self.public_key_token.as_str()
        } else {
            "null"
        };
        ComponentId(format!(
            "{}, Version={}, PublicKeyToken={}",
            self.name, self.version, token
        ))
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assembly version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// File version, falling back to the assembly version.
    pub fn file_version(&self) -> Version {
        self.file_version.unwrap_or(self.version)
    }

    /// Declared product, if any.
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// Whether the component carries a strong-name key.
    pub fn is_signed(&self) -> bool {
        self.public_key_blob.is_some()
    }

    /// Strong-name public key blob.
    pub fn public_key_blob(&self) -> Option<&[u8]> {
        self.public_key_blob.as_deref()
    }

    /// Public key token as lowercase hex; empty when unsigned.
    pub fn public_key_token(&self) -> &str {
        &self.public_key_token
    }

    /// Base64 SHA-256 of the component content.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// `Name,token` when signed, `Name:hash` otherwise.
    pub fn fingerprint(&self) -> String {
        if self.is_signed() {
            format!("{},{}", self.name, self.public_key_token)
        } else {
            format!("{}:{}", self.name, self.content_hash)
        }
    }

    /// `Name.token.lic`, or `Name.lic` when unsigned.
    pub fn license_file_name(&self) -> String {
        if self.is_signed() {
            format!("{}.{}.lic", self.name, self.public_key_token)
        } else {
            format!("{}.lic", self.name)
        }
    }

    /// Release date derived from the version build number.
    pub fn release_date(&self) -> DateTime<Utc> {
        self.version.release_date()
    }

    /// Key that verifies this component's licenses: the explicit license
    /// key if set, else the strong-name key.
    pub fn license_public_key(&self) -> Result<Option<RsaKey>, LicentiaError> {
        if let Some(xml) = &self.license_public_key_xml {
            return RsaKey::from_xml(xml).map(|key| Some(key.public_key()));
        }
        match &self.public_key_blob {
            Some(blob) => snk::public_key_from_blob(blob).map(Some),
            None => Ok(None),
        }
    }

    /// Declared license items.
    pub fn license_items(&self) -> &[DeclaredItem] {
        &self.license_items
    }

    /// Embedded resources.
    pub fn resources(&self) -> &[EmbeddedResource] {
        &self.resources
    }

    /// Loader for licenses this component carries, if any.
    pub fn license_loader(&self) -> Option<&dyn LicenseLoader> {
        self.license_loader.as_deref()
    }

    /// On-disk location, if known.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}
