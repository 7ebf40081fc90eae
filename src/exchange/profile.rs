// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity profile schema.
//!
//! A profile maps a fixed set of known fields to string values. Keys are kept
//! in a `BTreeMap`, so the canonical JSON form (and therefore the profile
//! hash) is identical for identical content regardless of input order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fields a profile may carry.
///
/// Declared in alphabetical order of their wire names; the derived `Ord`
/// fixes the canonical key order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    AadhaarNumber,
    Address,
    Dob,
    Gender,
    Name,
    Phone,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::AadhaarNumber,
        ProfileField::Address,
        ProfileField::Dob,
        ProfileField::Gender,
        ProfileField::Name,
        ProfileField::Phone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::AadhaarNumber => "aadhaar_number",
            ProfileField::Address => "address",
            ProfileField::Dob => "dob",
            ProfileField::Gender => "gender",
            ProfileField::Name => "name",
            ProfileField::Phone => "phone",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ProfileError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Unknown profile field: {0}")]
    UnknownField(String),

    #[error("Profile has no fields")]
    EmptyProfile,

    #[error("Field {0} has an empty value")]
    EmptyValue(ProfileField),

    #[error("At least one field must be requested")]
    EmptyFieldSet,

    #[error("Profile is not a JSON object of strings: {0}")]
    Malformed(String),
}

impl ProfileError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ProfileError::UnknownField(_) => "UNKNOWN_FIELD",
            ProfileError::EmptyProfile => "EMPTY_PROFILE",
            ProfileError::EmptyValue(_) => "EMPTY_VALUE",
            ProfileError::EmptyFieldSet => "EMPTY_FIELD_SET",
            ProfileError::Malformed(_) => "MALFORMED_PROFILE",
        }
    }
}

/// Field-to-value mapping with a canonical serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(BTreeMap<ProfileField, String>);

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from untyped input, rejecting unknown keys and blank values.
    pub fn from_map(raw: BTreeMap<String, String>) -> Result<Self, ProfileError> {
        let mut profile = Profile::new();
        for (key, value) in raw {
            let field: ProfileField = key.parse()?;
            let value = value.trim();
            if value.is_empty() {
                return Err(ProfileError::EmptyValue(field));
            }
            profile.insert(field, value);
        }
        if profile.is_empty() {
            return Err(ProfileError::EmptyProfile);
        }
        Ok(profile)
    }

    /// Parse the canonical JSON form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProfileError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_slice(bytes).map_err(|e| ProfileError::Malformed(e.to_string()))?;
        let mut profile = Profile::new();
        for (key, value) in raw {
            profile.insert(key.parse()?, value);
        }
        Ok(profile)
    }

    pub fn insert(&mut self, field: ProfileField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.0.keys().copied()
    }

    /// Keys in canonical order, no whitespace.
    pub fn to_canonical_json(&self) -> Vec<u8> {
        // Unit-variant keys and string values always serialize.
        serde_json::to_vec(&self.0).unwrap_or_default()
    }

    /// keccak256 of the canonical JSON form.
    pub fn data_hash(&self) -> B256 {
        keccak256(self.to_canonical_json())
    }

    /// Keep only the requested fields the profile actually has.
    ///
    /// Unknown names and fields the subject never set are skipped.
    pub fn project(&self, requested: &[String]) -> Profile {
        let mut projected = Profile::new();
        for name in requested {
            let Ok(field) = name.parse::<ProfileField>() else {
                continue;
            };
            if let Some(value) = self.0.get(&field) {
                projected.0.insert(field, value.clone());
            }
        }
        projected
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
            .into_iter()
            .map(|(field, value)| (field.as_str().to_string(), value))
            .collect()
    }
}

/// Validate a requester's field list: non-empty, known names, no repeats.
///
/// Order of first appearance is kept.
pub fn validate_requested_fields(requested: &[String]) -> Result<Vec<ProfileField>, ProfileError> {
    let mut fields: Vec<ProfileField> = Vec::with_capacity(requested.len());
    for name in requested {
        let field: ProfileField = name.trim().parse()?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        return Err(ProfileError::EmptyFieldSet);
    }
    Ok(fields)
}
