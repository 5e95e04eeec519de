//! Strongly-typed identifiers for lotkeeper

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::LotError;

/// Longest license plate accepted at check-in
pub const MAX_PLATE_LEN: usize = 10;

/// License plate of a vehicle; identifies an active session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    /// Wrap a plate without validation (for values read back from storage)
    pub fn new(plate: impl Into<String>) -> Self {
        Self(plate.into())
    }

    /// Validate user input: surrounding whitespace is trimmed, the result must be
    /// non-empty, at most [`MAX_PLATE_LEN`] characters and free of control characters.
    pub fn parse(input: &str) -> Result<Self, LotError> {
        let plate = input.trim();
        if plate.is_empty() {
            return Err(LotError::invalid_request("plate cannot be empty"));
        }
        if plate.chars().count() > MAX_PLATE_LEN {
            return Err(LotError::invalid_request(format!(
                "plate '{}' is longer than {} characters",
                plate, MAX_PLATE_LEN
            )));
        }
        if plate.chars().any(char::is_control) {
            return Err(LotError::invalid_request("plate contains control characters"));
        }
        Ok(Self(plate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that a row label is one or more ASCII uppercase letters
pub fn validate_row_label(row: &str) -> Result<(), String> {
    if row.is_empty() {
        return Err("row label cannot be empty".into());
    }
    if !row.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(format!("row label '{}' must be uppercase ASCII letters", row));
    }
    Ok(())
}

/// Code of a parking slot: a row label followed by the slot number within
/// the row, zero-padded to two digits ("A01", "B12", "C100").
///
/// Ordering is by row label first (string order), then by number
/// (numeric order), so `A2 < A10 < B1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotCode {
    row: String,
    number: u32,
}

impl SlotCode {
    pub fn new(row: impl Into<String>, number: u32) -> Result<Self, LotError> {
        let row = row.into();
        validate_row_label(&row).map_err(LotError::InvalidRequest)?;
        if number == 0 {
            return Err(LotError::invalid_request("slot numbers start at 1"));
        }
        Ok(Self { row, number })
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for SlotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.row, self.number)
    }
}

impl FromStr for SlotCode {
    type Err = LotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| LotError::invalid_request(format!("slot code '{}' has no number", s)))?;
        let (row, digits) = s.split_at(split);
        let number = digits
            .parse::<u32>()
            .map_err(|_| LotError::invalid_request(format!("invalid slot number in '{}'", s)))?;
        Self::new(row, number)
    }
}

impl TryFrom<String> for SlotCode {
    type Error = LotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotCode> for String {
    fn from(code: SlotCode) -> Self {
        code.to_string()
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
