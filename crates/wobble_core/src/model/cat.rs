//! Cat domain model and request payloads.
//!
//! # Responsibility
//! - Define the persisted cat record and its create/update/list payloads.
//! - Check storage invariants before writes reach SQL.
//!
//! # Invariants
//! - `name` is never blank.
//! - `age` is non-negative and `weight` positive when set.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row ID of a cat record.
pub type CatId = i64;

/// Persisted cat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    pub id: CatId,
    pub name: String,
    pub breed: Option<String>,
    pub color: Option<String>,
    /// Age in whole years.
    pub age: Option<i32>,
    /// Weight in kilograms.
    pub weight: Option<f64>,
    pub is_indoor: bool,
    pub is_vaccinated: bool,
    pub microchip_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub notes: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every update.
    pub updated_at: i64,
}

/// Payload for creating a cat. Omitted flags default to `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCatRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indoor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vaccinated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microchip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateCatRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CatValidationError> {
        validate_fields(Some(self.name.as_str()), self.age, self.weight)
    }
}

/// Partial update payload. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indoor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vaccinated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microchip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateCatRequest {
    /// Returns whether the payload changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), CatValidationError> {
        validate_fields(self.name.as_deref(), self.age, self.weight)
    }
}

/// Optional filters for listing cats. Set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indoor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vaccinated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

/// Pagination and filtering for cat listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCatsRequest {
    /// `0` selects the repository default page size.
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<CatFilter>,
}

/// Storage invariant violated by a cat payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CatValidationError {
    EmptyName,
    NegativeAge(i32),
    NonPositiveWeight(f64),
}

impl Display for CatValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "cat name cannot be empty"),
            Self::NegativeAge(age) => write!(f, "cat age cannot be negative, got {age}"),
            Self::NonPositiveWeight(weight) => {
                write!(f, "cat weight must be positive, got {weight}")
            }
        }
    }
}

impl Error for CatValidationError {}

fn validate_fields(
    name: Option<&str>,
    age: Option<i32>,
    weight: Option<f64>,
) -> Result<(), CatValidationError> {
    if name.is_some_and(|name| name.trim().is_empty()) {
        return Err(CatValidationError::EmptyName);
    }
    if let Some(age) = age.filter(|age| *age < 0) {
        return Err(CatValidationError::NegativeAge(age));
    }
    if let Some(weight) = weight.filter(|weight| weight.is_nan() || *weight <= 0.0) {
        return Err(CatValidationError::NonPositiveWeight(weight));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CatValidationError, CreateCatRequest, UpdateCatRequest};

    #[test]
    fn create_request_requires_non_blank_name() {
        assert_eq!(
            CreateCatRequest::new("   ").validate(),
            Err(CatValidationError::EmptyName)
        );
        assert!(CreateCatRequest::new("Miso").validate().is_ok());
    }

    #[test]
    fn create_request_rejects_negative_age_and_zero_weight() {
        let mut request = CreateCatRequest::new("Miso");
        request.age = Some(-1);
        assert_eq!(request.validate(), Err(CatValidationError::NegativeAge(-1)));

        request.age = Some(3);
        request.weight = Some(0.0);
        assert_eq!(
            request.validate(),
            Err(CatValidationError::NonPositiveWeight(0.0))
        );
    }

    #[test]
    fn empty_update_is_detected_and_valid() {
        let update = UpdateCatRequest::default();
        assert!(update.is_empty());
        assert!(update.validate().is_ok());

        let update = UpdateCatRequest {
            name: Some(String::new()),
            ..UpdateCatRequest::default()
        };
        assert!(!update.is_empty());
        assert_eq!(update.validate(), Err(CatValidationError::EmptyName));
    }
}
