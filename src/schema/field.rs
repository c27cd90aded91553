use std::collections::BTreeMap;

use crate::value::ValueKind;

/// Well-known attribute keys.
pub mod attribute {
    pub const PRIMARY_KEY: &str = "PrimaryKey";
    pub const NULLABLE: &str = "Nullable";
    pub const ENCRYPTED: &str = "Encrypted";
    pub const STORAGE_KEY: &str = "StorageKey";
}

/// Parse a textual flag. Accepts `true`, `yes` and `1` in any case.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

/// Typed attributes attached to a field when it is registered.
///
/// The well-known flags are plain booleans; anything else lands in `extra`
/// as free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAttributes {
    pub primary_key: bool,
    pub nullable: bool,
    pub encrypted: bool,
    pub storage_key: bool,
    pub extra: BTreeMap<String, String>,
}

impl FieldAttributes {
    pub fn key() -> Self {
        Self {
            primary_key: true,
            ..Self::default()
        }
    }

    pub fn nullable() -> Self {
        Self {
            nullable: true,
            ..Self::default()
        }
    }

    fn flag_slot(&mut self, key: &str) -> Option<&mut bool> {
        if key.eq_ignore_ascii_case(attribute::PRIMARY_KEY) {
            Some(&mut self.primary_key)
        } else if key.eq_ignore_ascii_case(attribute::NULLABLE) {
            Some(&mut self.nullable)
        } else if key.eq_ignore_ascii_case(attribute::ENCRYPTED) {
            Some(&mut self.encrypted)
        } else if key.eq_ignore_ascii_case(attribute::STORAGE_KEY) {
            Some(&mut self.storage_key)
        } else {
            None
        }
    }

    /// Attribute value as text; well-known flags answer `"true"`/`"false"`.
    pub fn get(&self, key: &str) -> Option<String> {
        let flag = if key.eq_ignore_ascii_case(attribute::PRIMARY_KEY) {
            Some(self.primary_key)
        } else if key.eq_ignore_ascii_case(attribute::NULLABLE) {
            Some(self.nullable)
        } else if key.eq_ignore_ascii_case(attribute::ENCRYPTED) {
            Some(self.encrypted)
        } else if key.eq_ignore_ascii_case(attribute::STORAGE_KEY) {
            Some(self.storage_key)
        } else {
            None
        };
        match flag {
            Some(flag) => Some(flag.to_string()),
            None => self.extra.get(key).cloned(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.flag_slot(key) {
            Some(slot) => *slot = parse_flag(value),
            None => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|value| parse_flag(&value)).unwrap_or(false)
    }
}

/// A single field registration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: ValueKind,
    pub attributes: FieldAttributes,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: ValueKind, attributes: FieldAttributes) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.kind.is_stored()
    }

    pub fn is_key(&self) -> bool {
        self.attributes.primary_key
    }
}
