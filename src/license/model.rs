//! License and license items.
//!
//! A [`LicenseBuilder`] is the editable form; [`LicenseBuilder::build`]
//! checks the items and produces an immutable [`License`]. Use
//! [`License::to_builder`] to derive an edited copy.

use crate::LicentiaError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Selects the kind-specific validation applied to a license.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LicenseKind {
    /// Bound to a component fingerprint.
    Component,
    /// Bound to a machine fingerprint.
    Machine,
    /// Bound to a user identity.
    User,
    /// No binding.
    Unrestricted,
    /// Validated by a host-registered hook of this name.
    Custom(String),
}

/// The maximum license date, meaning "never".
pub fn max_utc_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Truncate to midnight UTC.
pub fn utc_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(instant)
}

/// Format a license date as `YYYY/MM/DD`.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Parse a `YYYY/MM/DD` license date; empty text is the max date.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>, LicentiaError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(max_utc_date());
    }
    let date = NaiveDate::parse_from_str(text, "%Y/%m/%d")
        .map_err(|e| LicentiaError::ProtocolError(format!("Invalid date {:?}: {}", text, e)))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| LicentiaError::ProtocolError(format!("Invalid date {:?}", text)))
}

/// A named feature granted by a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseItem {
    name: String,
    #[serde(default)]
    override_expiration_date: bool,
}

impl LicenseItem {
    /// Item that obeys the license expiration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            override_expiration_date: false,
        }
    }

    /// Item exempt from the license expiration.
    pub fn overriding_expiration(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            override_expiration_date: true,
        }
    }

    /// Item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the item ignores the license expiration.
    pub fn override_expiration_date(&self) -> bool {
        self.override_expiration_date
    }
}

/// Editable license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseBuilder {
    kind: LicenseKind,
    id: String,
    category: String,
    product: String,
    company: String,
    user_name: String,
    user_company: String,
    data: String,
    expiration: DateTime<Utc>,
    upgrade_expiration: DateTime<Utc>,
    items: Vec<LicenseItem>,
}

impl LicenseBuilder {
    /// Start a license of the given kind with no expiration.
    pub fn new(kind: LicenseKind) -> Self {
        Self {
            kind,
            id: String::new(),
            category: String::new(),
            product: String::new(),
            company: String::new(),
            user_name: String::new(),
            user_company: String::new(),
            data: String::new(),
            expiration: max_utc_date(),
            upgrade_expiration: max_utc_date(),
            items: Vec::new(),
        }
    }

    /// Change the license kind.
    pub fn kind(mut self, kind: LicenseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the license id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the category (e.g. "Evaluation").
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the licensed product name.
    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Set the issuing company.
    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    /// Set the licensee name.
    pub fn user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    /// Set the licensee company.
    pub fn user_company(mut self, user_company: impl Into<String>) -> Self {
        self.user_company = user_company.into();
        self
    }

    /// Set the kind-specific validation payload.
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the expiration, truncated to the UTC day.
    pub fn expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = utc_day(expiration);
        self
    }

    /// Set the upgrade expiration, truncated to the UTC day.
    pub fn upgrade_expiration(mut self, upgrade_expiration: DateTime<Utc>) -> Self {
        self.upgrade_expiration = utc_day(upgrade_expiration);
        self
    }

    /// Add an item.
    pub fn item(mut self, item: LicenseItem) -> Self {
        self.items.push(item);
        self
    }

    /// Add several items.
    pub fn items(mut self, items: impl IntoIterator<Item = LicenseItem>) -> Self {
        self.items.extend(items);
        self
    }

    /// Freeze into a [`License`].
    ///
    /// Item names must be non-empty and unique.
    pub fn build(self) -> Result<License, LicentiaError> {
        let mut seen = HashSet::new();
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(LicentiaError::EmptyItemName { index });
            }
            if !seen.insert(item.name.as_str()) {
                return Err(LicentiaError::DuplicateItemName(item.name.clone()));
            }
        }

        Ok(License {
            fields: self,
            signed_string: None,
            kind_check: OnceCell::new(),
        })
    }
}

/// Immutable license.
#[derive(Debug, Clone)]
pub struct License {
    fields: LicenseBuilder,
    signed_string: Option<String>,
    kind_check: OnceCell<Option<String>>,
}

impl License {
    /// Editable copy of this license. The signature is not carried over.
    pub fn to_builder(&self) -> LicenseBuilder {
        self.fields.clone()
    }

    /// Kind of license.
    pub fn kind(&self) -> &LicenseKind {
        &self.fields.kind
    }

    /// License id.
    pub fn id(&self) -> &str {
        &self.fields.id
    }

    /// Category.
    pub fn category(&self) -> &str {
        &self.fields.category
    }

    /// Product name.
    pub fn product(&self) -> &str {
        &self.fields.product
    }

    /// Issuing company.
    pub fn company(&self) -> &str {
        &self.fields.company
    }

    /// Licensee name.
    pub fn user_name(&self) -> &str {
        &self.fields.user_name
    }

    /// Licensee company.
    pub fn user_company(&self) -> &str {
        &self.fields.user_company
    }

    /// Kind-specific validation payload.
    pub fn data(&self) -> &str {
        &self.fields.data
    }

    /// Expiration (UTC day). [`max_utc_date`] when unlimited.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.fields.expiration
    }

    /// Last release date covered by the license.
    pub fn upgrade_expiration(&self) -> DateTime<Utc> {
        self.fields.upgrade_expiration
    }

    /// Items in declaration order.
    pub fn items(&self) -> &[LicenseItem] {
        &self.fields.items
    }

    /// Look up an item by name.
    pub fn item(&self, name: &str) -> Option<&LicenseItem> {
        self.fields.items.iter().find(|item| item.name == name)
    }

    /// Whether `now` is past the expiration.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.fields.expiration
    }

    /// Signed text this license was loaded from or produced as.
    pub fn signed_string(&self) -> Option<&str> {
        self.signed_string.as_deref()
    }

    pub(crate) fn with_signed_string(mut self, signed: String) -> Self {
        self.signed_string = Some(signed);
        self
    }

    /// Run the kind-specific check once per license instance and reuse the
    /// result afterwards. `None` means the check passed.
    pub(crate) fn kind_check(&self, check: impl FnOnce() -> Option<String>) -> Option<String> {
        self.kind_check.get_or_init(check).clone()
    }
}
