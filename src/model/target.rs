use crate::core::validated::{Validated, at_most_one, exactly_one, invalid, optional, required, valid};
use crate::core::{EntityKind, Lens, ProgramId, Result, TargetId};
use crate::events::EventPayload;
use crate::storage::{Database, Entity, Existence, Table};
use crate::{field_lens, validate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref HMS: Regex =
        Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").expect("valid hms regex");
    static ref DMS: Regex =
        Regex::new(r"^([+-]?)(\d{1,2}):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").expect("valid dms regex");
    static ref EPOCH: Regex = Regex::new(r"^J(\d{4}(?:\.\d+)?)$").expect("valid epoch regex");
}

/// Right ascension in degrees, `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RightAscension(f64);

impl RightAscension {
    pub fn from_degrees(degrees: f64) -> Validated<Self> {
        if (0.0..360.0).contains(&degrees) {
            valid(Self(degrees))
        } else {
            invalid(format!("Right ascension {degrees} must be in [0, 360) degrees"))
        }
    }

    /// Parses `HH:MM:SS.sss`.
    pub fn from_hms(s: &str) -> Validated<Self> {
        let malformed = || format!("Could not parse '{s}' as HH:MM:SS right ascension");
        let caps = HMS.captures(s.trim()).ok_or_else(|| crate::core::InputErrors::single(malformed()))?;
        let (h, m, sec) = (field(&caps[1]), field(&caps[2]), field(&caps[3]));
        if h >= 24.0 || m >= 60.0 || sec >= 60.0 {
            return invalid(malformed());
        }
        Self::from_degrees((h + m / 60.0 + sec / 3600.0) * 15.0)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for RightAscension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Whole milliseconds of time, wrapping 24h back to 0.
        let millis = (self.0 / 15.0 * 3_600_000.0).round() as u64 % 86_400_000;
        let (h, rest) = (millis / 3_600_000, millis % 3_600_000);
        let (m, rest) = (rest / 60_000, rest % 60_000);
        write!(f, "{:02}:{:02}:{:02}.{:03}", h, m, rest / 1000, rest % 1000)
    }
}

/// Declination in degrees, `[-90, 90]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Declination(f64);

impl Declination {
    pub fn from_degrees(degrees: f64) -> Validated<Self> {
        if (-90.0..=90.0).contains(&degrees) {
            valid(Self(degrees))
        } else {
            invalid(format!("Declination {degrees} must be in [-90, 90] degrees"))
        }
    }

    /// Parses `[+-]DD:MM:SS.ss`.
    pub fn from_dms(s: &str) -> Validated<Self> {
        let malformed = || format!("Could not parse '{s}' as DD:MM:SS declination");
        let caps = DMS.captures(s.trim()).ok_or_else(|| crate::core::InputErrors::single(malformed()))?;
        let (d, m, sec) = (field(&caps[2]), field(&caps[3]), field(&caps[4]));
        if m >= 60.0 || sec >= 60.0 {
            return invalid(malformed());
        }
        let magnitude = d + m / 60.0 + sec / 3600.0;
        let sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
        Self::from_degrees(sign * magnitude)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

fn field(s: &str) -> f64 {
    s.parse().unwrap_or(f64::NAN)
}

/// Julian epoch, e.g. `J2000.000`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epoch(f64);

impl Epoch {
    pub const J2000: Epoch = Epoch(2000.0);

    pub fn parse(s: &str) -> Validated<Self> {
        EPOCH
            .captures(s.trim())
            .and_then(|caps| caps[1].parse().ok())
            .map(Epoch)
            .ok_or_else(|| crate::core::InputErrors::single(format!("Could not parse '{s}' as a Julian epoch")))
    }

    pub fn julian_year(&self) -> f64 {
        self.0
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::J2000
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J{:.3}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EphemerisKeyType {
    Comet,
    AsteroidNew,
    AsteroidOld,
    MajorBody,
    UserSupplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiderealTracking {
    pub ra: RightAscension,
    pub dec: Declination,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tracking {
    Sidereal(SiderealTracking),
    #[serde(rename_all = "camelCase")]
    Nonsidereal {
        key_type: EphemerisKeyType,
        des: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: TargetId,
    pub program_id: ProgramId,
    pub existence: Existence,
    pub name: String,
    pub tracking: Tracking,
}

impl Target {
    pub fn name() -> Lens<Target, String> {
        field_lens!(Target, name: String)
    }

    pub fn tracking() -> Lens<Target, Tracking> {
        field_lens!(Target, tracking: Tracking)
    }
}

impl Entity for Target {
    type Id = TargetId;

    const KIND: EntityKind = EntityKind::Target;

    fn id(&self) -> TargetId {
        self.id
    }

    fn existence(&self) -> Existence {
        self.existence
    }

    fn existence_lens() -> Lens<Self, Existence> {
        field_lens!(Target, existence: Existence)
    }

    fn table_lens() -> Lens<Database, Table<TargetId, Target>> {
        Database::targets()
    }

    fn table(db: &Database) -> &Table<TargetId, Target> {
        db.target_table()
    }

    fn program_id(&self) -> ProgramId {
        self.program_id
    }

    fn check_references(&self, db: &Database) -> Result<()> {
        db.check_program(self.program_id)
    }

    fn into_payload(self) -> EventPayload {
        EventPayload::Target(self)
    }
}

// ----------------------------------------------------------------------------
// Inputs
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightAscensionInput {
    pub degrees: Option<f64>,
    pub hms: Option<String>,
}

impl RightAscensionInput {
    pub fn validate(self) -> Validated<RightAscension> {
        exactly_one(
            "ra",
            vec![
                ("degrees", self.degrees.map(RightAscension::from_degrees)),
                ("hms", self.hms.as_deref().map(RightAscension::from_hms)),
            ],
        )?
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinationInput {
    pub degrees: Option<f64>,
    pub dms: Option<String>,
}

impl DeclinationInput {
    pub fn validate(self) -> Validated<Declination> {
        exactly_one(
            "dec",
            vec![
                ("degrees", self.degrees.map(Declination::from_degrees)),
                ("dms", self.dms.as_deref().map(Declination::from_dms)),
            ],
        )?
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiderealInput {
    pub ra: Option<RightAscensionInput>,
    pub dec: Option<DeclinationInput>,
    pub epoch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonsiderealInput {
    pub key_type: Option<EphemerisKeyType>,
    pub des: Option<String>,
}

/// Partial tracking change, validated field by field.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEdit {
    Sidereal {
        ra: Option<RightAscension>,
        dec: Option<Declination>,
        epoch: Option<Epoch>,
    },
    Nonsidereal {
        key_type: Option<EphemerisKeyType>,
        des: Option<String>,
    },
}

impl SiderealInput {
    fn validate(self) -> Validated<TrackingEdit> {
        validate! {
            ra = optional(self.ra, RightAscensionInput::validate),
            dec = optional(self.dec, DeclinationInput::validate),
            epoch = optional(self.epoch, |e| Epoch::parse(&e)),
            => TrackingEdit::Sidereal { ra, dec, epoch }
        }
    }
}

impl NonsiderealInput {
    fn validate(self) -> Validated<TrackingEdit> {
        let des = optional(self.des, |d| non_blank(d, "des"))?;
        Ok(TrackingEdit::Nonsidereal {
            key_type: self.key_type,
            des,
        })
    }
}

impl TrackingEdit {
    /// Merges with the current tracking; switching kinds requires a complete definition.
    pub fn apply(self, current: Option<&Tracking>) -> Validated<Tracking> {
        match (self, current) {
            (TrackingEdit::Sidereal { ra, dec, epoch }, Some(Tracking::Sidereal(cur))) => {
                Ok(Tracking::Sidereal(SiderealTracking {
                    ra: ra.unwrap_or(cur.ra),
                    dec: dec.unwrap_or(cur.dec),
                    epoch: epoch.unwrap_or(cur.epoch),
                }))
            }
            (TrackingEdit::Sidereal { ra, dec, epoch }, _) => validate! {
                ra = required(ra, "sidereal.ra"),
                dec = required(dec, "sidereal.dec"),
                => Tracking::Sidereal(SiderealTracking { ra, dec, epoch: epoch.unwrap_or_default() })
            },
            (
                TrackingEdit::Nonsidereal { key_type, des },
                Some(Tracking::Nonsidereal { key_type: cur_key, des: cur_des }),
            ) => Ok(Tracking::Nonsidereal {
                key_type: key_type.unwrap_or(*cur_key),
                des: des.unwrap_or_else(|| cur_des.clone()),
            }),
            (TrackingEdit::Nonsidereal { key_type, des }, _) => validate! {
                key_type = required(key_type, "nonsidereal.keyType"),
                des = required(des, "nonsidereal.des"),
                => Tracking::Nonsidereal { key_type, des }
            },
        }
    }
}

fn non_blank(value: String, field: &str) -> Validated<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        invalid(format!("{field} may not be blank"))
    } else {
        valid(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetInput {
    #[serde(default)]
    pub target_id: Option<TargetId>,
    pub program_id: ProgramId,
    pub name: Option<String>,
    pub sidereal: Option<SiderealInput>,
    pub nonsidereal: Option<NonsiderealInput>,
}

/// A create request that passed validation; only the id is still missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCreateTarget {
    pub program_id: ProgramId,
    pub name: String,
    pub tracking: Tracking,
}

impl ValidCreateTarget {
    pub fn build(&self, id: TargetId) -> Target {
        Target {
            id,
            program_id: self.program_id,
            existence: Existence::Present,
            name: self.name.clone(),
            tracking: self.tracking.clone(),
        }
    }
}

impl CreateTargetInput {
    pub fn validate(self) -> Validated<ValidCreateTarget> {
        let program_id = self.program_id;
        let tracking = exactly_one(
            "tracking",
            vec![
                ("sidereal", self.sidereal.map(SiderealInput::validate)),
                ("nonsidereal", self.nonsidereal.map(NonsiderealInput::validate)),
            ],
        )
        .and_then(|edit| edit)
        .and_then(|edit| edit.apply(None));

        validate! {
            name = required(self.name, "name").and_then(|n| non_blank(n, "name")),
            tracking = tracking,
            => ValidCreateTarget { program_id, name, tracking }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPropertiesInput {
    pub name: Option<String>,
    pub sidereal: Option<SiderealInput>,
    pub nonsidereal: Option<NonsiderealInput>,
    pub existence: Option<Existence>,
}

/// Validated target patch, applied to each selected target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetEdit {
    pub name: Option<String>,
    pub tracking: Option<TrackingEdit>,
    pub existence: Option<Existence>,
}

impl TargetPropertiesInput {
    pub fn validate(self) -> Validated<TargetEdit> {
        let tracking = at_most_one(
            "tracking",
            vec![
                ("sidereal", self.sidereal.map(SiderealInput::validate)),
                ("nonsidereal", self.nonsidereal.map(NonsiderealInput::validate)),
            ],
        )
        .and_then(|edit| edit.transpose());
        let existence = self.existence;

        validate! {
            name = optional(self.name, |n| non_blank(n, "name")),
            tracking = tracking,
            => TargetEdit { name, tracking, existence }
        }
    }
}

impl TargetEdit {
    pub fn apply(&self, target: &Target) -> Validated<Target> {
        let mut next = target.clone();
        if let Some(name) = &self.name {
            next = Target::name().set(&next, name.clone());
        }
        if let Some(edit) = &self.tracking {
            next = Target::tracking().try_modify(&next, |cur| edit.clone().apply(Some(&cur)))?;
        }
        if let Some(existence) = self.existence {
            next = next.with_existence(existence);
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelectInput {
    pub program_id: Option<ProgramId>,
    pub target_ids: Option<Vec<TargetId>>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTargetInput {
    pub select: TargetSelectInput,
    pub patch: TargetPropertiesInput,
}
