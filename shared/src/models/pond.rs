//! Pond Model
//!
//! A pond (facility) owns its pools (rearing units) and berkas (supporting
//! documents). New ponds wait in SUBMISION until an administrator activates
//! or disables them.

use super::audit::Audit;
use crate::error::ValidationErrors;
use crate::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_URL_LEN, optional_text, require_id,
    require_non_zero, require_text,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Approval state of a pond
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "pond_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PondStatus {
    /// Waiting for review
    #[default]
    Submision,
    Actived,
    /// Rejected; `reasons` says why
    Disabled,
}

impl PondStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submision => "SUBMISION",
            Self::Actived => "ACTIVED",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for PondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership model of a pond
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "pond_type", rename_all = "lowercase"))]
pub enum PondType {
    #[default]
    Individu,
    Team,
}

impl PondType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individu => "individu",
            Self::Team => "team",
        }
    }
}

impl FromStr for PondType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individu" => Ok(Self::Individu),
            "team" => Ok(Self::Team),
            other => Err(format!("unknown pond type: {other}")),
        }
    }
}

/// Pond entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Pond {
    pub id: Uuid,
    /// Owning user
    pub user_id: Option<Uuid>,
    pub name: String,
    pub country_id: Uuid,
    pub province_id: Uuid,
    pub city_id: Uuid,
    pub district_id: Uuid,
    pub detail_address: String,
    pub note_address: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(rename = "type"))]
    pub pond_type: PondType,
    pub latitude: f64,
    pub longitude: f64,
    pub image: String,
    pub status: PondStatus,
    /// Rejection reason, set when DISABLED
    pub reasons: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,

    // -- Relations (populated by application code, skipped by FromRow) --
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub berkas: Vec<Berkas>,
}

impl Pond {
    /// Overwrite the editable profile fields. Status is left alone.
    pub fn apply_profile(&mut self, profile: &PondProfile) {
        self.name = profile.name.clone();
        self.country_id = profile.country_id;
        self.province_id = profile.province_id;
        self.city_id = profile.city_id;
        self.district_id = profile.district_id;
        self.detail_address = profile.detail_address.clone();
        self.note_address = profile.note_address.clone();
        self.pond_type = profile.parsed_type().unwrap_or_default();
        self.latitude = profile.latitude;
        self.longitude = profile.longitude;
        self.image = profile.image.clone();
    }

    /// Overwrite only the fields the update carries
    pub fn apply_update(&mut self, update: &UpdatePondInput) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(id) = update.country_id {
            self.country_id = id;
        }
        if let Some(id) = update.province_id {
            self.province_id = id;
        }
        if let Some(id) = update.city_id {
            self.city_id = id;
        }
        if let Some(id) = update.district_id {
            self.district_id = id;
        }
        if let Some(address) = &update.detail_address {
            self.detail_address = address.clone();
        }
        if let Some(note) = &update.note_address {
            self.note_address = note.clone();
        }
        if let Some(pond_type) = update.parsed_type() {
            self.pond_type = pond_type;
        }
        if let Some(latitude) = update.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = update.longitude {
            self.longitude = longitude;
        }
        if let Some(image) = &update.image {
            self.image = image.clone();
        }
    }
}

/// Pool entity (rearing unit inside a pond)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Pool {
    pub id: Uuid,
    pub pond_id: Uuid,
    pub name: String,
    pub long: f64,
    pub wide: f64,
    pub image: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

/// Berkas entity (supporting document of a pond submission)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Berkas {
    pub id: Uuid,
    pub pond_id: Uuid,
    pub name: String,
    pub file: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

// ── Inputs ──────────────────────────────────────────────────────────

/// Editable pond fields shared by create, update and resubmission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PondProfile {
    pub name: String,
    #[serde(default)]
    pub country_id: Uuid,
    #[serde(default)]
    pub province_id: Uuid,
    #[serde(default)]
    pub city_id: Uuid,
    #[serde(default)]
    pub district_id: Uuid,
    #[serde(default)]
    pub detail_address: String,
    #[serde(default)]
    pub note_address: String,
    #[serde(rename = "type", default)]
    pub pond_type: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub image: String,
}

impl PondProfile {
    pub fn parsed_type(&self) -> Option<PondType> {
        self.pond_type.parse().ok()
    }

    fn check(&self, errors: &mut ValidationErrors) {
        require_text(errors, "pond", "name", &self.name, MAX_NAME_LEN);
        require_id(errors, "pond", "country_id", self.country_id);
        require_id(errors, "pond", "province_id", self.province_id);
        require_id(errors, "pond", "city_id", self.city_id);
        require_id(errors, "pond", "district_id", self.district_id);
        optional_text(
            errors,
            "pond",
            "detail_address",
            Some(&self.detail_address),
            MAX_ADDRESS_LEN,
        );
        optional_text(
            errors,
            "pond",
            "note_address",
            Some(&self.note_address),
            MAX_NOTE_LEN,
        );
        if self.pond_type.trim().is_empty() {
            errors.push("pond", "type", "is required");
        } else if self.parsed_type().is_none() {
            errors.push("pond", "type", "must be one of: individu, team");
        }
        errors.check(
            (-90.0..=90.0).contains(&self.latitude),
            "pond",
            "latitude",
            "must be between -90 and 90",
        );
        errors.check(
            (-180.0..=180.0).contains(&self.longitude),
            "pond",
            "longitude",
            "must be between -180 and 180",
        );
        optional_text(errors, "pond", "image", Some(&self.image), MAX_URL_LEN);
    }

    /// Scalar checks only
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check(&mut errors);
        errors.into_result()
    }
}

/// Update pond payload: profile fields only, `None` leaves the stored
/// value in place
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePondInput {
    pub name: Option<String>,
    pub country_id: Option<Uuid>,
    pub province_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub detail_address: Option<String>,
    pub note_address: Option<String>,
    #[serde(rename = "type")]
    pub pond_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<String>,
}

impl UpdatePondInput {
    pub fn parsed_type(&self) -> Option<PondType> {
        self.pond_type.as_deref().and_then(|t| t.parse().ok())
    }

    /// Checks the fields that are present
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            require_text(&mut errors, "pond", "name", name, MAX_NAME_LEN);
        }
        for (field, id) in [
            ("country_id", self.country_id),
            ("province_id", self.province_id),
            ("city_id", self.city_id),
            ("district_id", self.district_id),
        ] {
            if let Some(id) = id {
                require_id(&mut errors, "pond", field, id);
            }
        }
        optional_text(
            &mut errors,
            "pond",
            "detail_address",
            self.detail_address.as_deref(),
            MAX_ADDRESS_LEN,
        );
        optional_text(
            &mut errors,
            "pond",
            "note_address",
            self.note_address.as_deref(),
            MAX_NOTE_LEN,
        );
        if self.pond_type.is_some() && self.parsed_type().is_none() {
            errors.push("pond", "type", "must be one of: individu, team");
        }
        if let Some(latitude) = self.latitude {
            errors.check(
                (-90.0..=90.0).contains(&latitude),
                "pond",
                "latitude",
                "must be between -90 and 90",
            );
        }
        if let Some(longitude) = self.longitude {
            errors.check(
                (-180.0..=180.0).contains(&longitude),
                "pond",
                "longitude",
                "must be between -180 and 180",
            );
        }
        optional_text(&mut errors, "pond", "image", self.image.as_deref(), MAX_URL_LEN);
        errors.into_result()
    }
}

/// Create pool payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePoolInput {
    pub name: String,
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub wide: f64,
    #[serde(default)]
    pub image: String,
}

impl CreatePoolInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_pool(&mut errors, &self.name, self.long, self.wide, &self.image);
        errors.into_result()
    }
}

/// Create berkas payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBerkasInput {
    pub name: String,
    #[serde(default)]
    pub file: String,
}

impl CreateBerkasInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_berkas(&mut errors, &self.name, &self.file);
        errors.into_result()
    }
}

/// Create pond payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePondInput {
    #[serde(flatten)]
    pub profile: PondProfile,
    #[serde(default)]
    pub pools: Vec<CreatePoolInput>,
    #[serde(default)]
    pub berkas: Vec<CreateBerkasInput>,
}

impl CreatePondInput {
    /// Every violation of the pond and its nested pools and berkas
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.profile.check(&mut errors);
        errors.check(
            !self.pools.is_empty(),
            "pond",
            "pools",
            "at least one pool is required",
        );
        errors.check(
            !self.berkas.is_empty(),
            "pond",
            "berkas",
            "at least one berkas is required",
        );
        for (i, pool) in self.pools.iter().enumerate() {
            if let Err(nested) = pool.validate() {
                errors.merge_nested(&format!("pools[{i}]"), nested);
            }
        }
        for (i, berkas) in self.berkas.iter().enumerate() {
            if let Err(nested) = berkas.validate() {
                errors.merge_nested(&format!("berkas[{i}]"), nested);
            }
        }
        errors.into_result()
    }
}

/// Pond status transition payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePondStatusInput {
    #[serde(default)]
    pub pond_id: Uuid,
    pub status: Option<PondStatus>,
    #[serde(default)]
    pub reasons: Option<String>,
}

impl UpdatePondStatusInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, "pond", "pond_id", self.pond_id);
        errors.check(self.status.is_some(), "pond", "status", "is required");

        let reasons = self.reasons.as_deref().unwrap_or_default();
        if self.status == Some(PondStatus::Disabled) && reasons.trim().is_empty() {
            errors.push("pond", "reasons", "is required when status is DISABLED");
        }
        optional_text(&mut errors, "pond", "reasons", Some(reasons), MAX_NOTE_LEN);
        errors.into_result()
    }
}

/// Pool entry of a resubmission. A nil `id` means a new pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePoolInput {
    #[serde(default)]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub wide: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl UpdatePoolInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_pool(&mut errors, &self.name, self.long, self.wide, &self.image);
        errors.into_result()
    }
}

/// Berkas entry of a resubmission. A nil `id` means a new document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBerkasInput {
    #[serde(default)]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl UpdateBerkasInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_berkas(&mut errors, &self.name, &self.file);
        errors.into_result()
    }
}

/// Resubmission payload: full profile plus merged pool and berkas lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResubmitPondInput {
    #[serde(flatten)]
    pub profile: PondProfile,
    #[serde(default)]
    pub pools: Vec<UpdatePoolInput>,
    #[serde(default)]
    pub berkas: Vec<UpdateBerkasInput>,
}

impl ResubmitPondInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.profile.check(&mut errors);
        errors.check(
            !self.pools.is_empty(),
            "pond",
            "pools",
            "at least one pool is required",
        );
        errors.check(
            !self.berkas.is_empty(),
            "pond",
            "berkas",
            "at least one berkas is required",
        );
        for (i, pool) in self.pools.iter().enumerate() {
            if let Err(nested) = pool.validate() {
                errors.merge_nested(&format!("pools[{i}]"), nested);
            }
        }
        for (i, berkas) in self.berkas.iter().enumerate() {
            if let Err(nested) = berkas.validate() {
                errors.merge_nested(&format!("berkas[{i}]"), nested);
            }
        }
        errors.into_result()
    }
}

/// Pond list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PondFilter {
    pub status: Option<PondStatus>,
    /// Owner
    pub user_id: Option<Uuid>,
}

fn check_pool(errors: &mut ValidationErrors, name: &str, long: f64, wide: f64, image: &str) {
    require_text(errors, "pool", "name", name, MAX_NAME_LEN);
    require_non_zero(errors, "pool", "long", long);
    require_non_zero(errors, "pool", "wide", wide);
    require_text(errors, "pool", "image", image, MAX_URL_LEN);
}

fn check_berkas(errors: &mut ValidationErrors, name: &str, file: &str) {
    require_text(errors, "berkas", "name", name, MAX_NAME_LEN);
    require_text(errors, "berkas", "file", file, MAX_URL_LEN);
}
