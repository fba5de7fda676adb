use crate::core::validated::{Validated, ValidatedExt, at_most_one, invalid, optional, valid};
use crate::core::Lens;
use crate::{field_lens, validate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const AIR_MASS_MIN: f64 = 1.0;
pub const AIR_MASS_MAX: f64 = 3.0;
pub const HOUR_ANGLE_MIN: f64 = -5.0;
pub const HOUR_ANGLE_MAX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageQuality {
    PointOne,
    PointTwo,
    PointThree,
    PointFour,
    PointSix,
    PointEight,
    OnePointZero,
    OnePointFive,
    TwoPointZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudExtinction {
    PointOne,
    PointThree,
    PointFive,
    OnePointZero,
    OnePointFive,
    TwoPointZero,
    ThreePointZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkyBackground {
    Darkest,
    Dark,
    Gray,
    Bright,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaterVapor {
    VeryDry,
    Dry,
    Median,
    Wet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirMassRange {
    min: f64,
    max: f64,
}

impl AirMassRange {
    pub fn new(min: f64, max: f64) -> Validated<Self> {
        let bounds = air_mass_bound("minimum", min).zip(air_mass_bound("maximum", max))?;
        ordered("Airmass", bounds.0, bounds.1)?;
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Default for AirMassRange {
    fn default() -> Self {
        Self { min: 1.0, max: 2.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourAngleRange {
    min_hours: f64,
    max_hours: f64,
}

impl HourAngleRange {
    pub fn new(min_hours: f64, max_hours: f64) -> Validated<Self> {
        let bounds = hour_angle_bound("minimum", min_hours)
            .zip(hour_angle_bound("maximum", max_hours))?;
        ordered("Hour angle", bounds.0, bounds.1)?;
        Ok(Self { min_hours, max_hours })
    }

    pub fn min_hours(&self) -> f64 {
        self.min_hours
    }

    pub fn max_hours(&self) -> f64 {
        self.max_hours
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElevationRange {
    AirMass(AirMassRange),
    HourAngle(HourAngleRange),
}

impl Default for ElevationRange {
    fn default() -> Self {
        ElevationRange::AirMass(AirMassRange::default())
    }
}

impl fmt::Display for ElevationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevationRange::AirMass(r) => write!(f, "airmass {:.2}..{:.2}", r.min, r.max),
            ElevationRange::HourAngle(r) => {
                write!(f, "hour angle {:.2}h..{:.2}h", r.min_hours, r.max_hours)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSet {
    pub image_quality: ImageQuality,
    pub cloud_extinction: CloudExtinction,
    pub sky_background: SkyBackground,
    pub water_vapor: WaterVapor,
    pub elevation_range: ElevationRange,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            image_quality: ImageQuality::PointEight,
            cloud_extinction: CloudExtinction::PointThree,
            sky_background: SkyBackground::Bright,
            water_vapor: WaterVapor::Wet,
            elevation_range: ElevationRange::default(),
        }
    }
}

impl ConstraintSet {
    pub fn image_quality() -> Lens<ConstraintSet, ImageQuality> {
        field_lens!(ConstraintSet, image_quality: ImageQuality)
    }

    pub fn cloud_extinction() -> Lens<ConstraintSet, CloudExtinction> {
        field_lens!(ConstraintSet, cloud_extinction: CloudExtinction)
    }

    pub fn sky_background() -> Lens<ConstraintSet, SkyBackground> {
        field_lens!(ConstraintSet, sky_background: SkyBackground)
    }

    pub fn water_vapor() -> Lens<ConstraintSet, WaterVapor> {
        field_lens!(ConstraintSet, water_vapor: WaterVapor)
    }

    pub fn elevation_range() -> Lens<ConstraintSet, ElevationRange> {
        field_lens!(ConstraintSet, elevation_range: ElevationRange)
    }
}

fn air_mass_bound(which: &str, value: f64) -> Validated<f64> {
    if (AIR_MASS_MIN..=AIR_MASS_MAX).contains(&value) {
        valid(value)
    } else {
        invalid(format!(
            "Airmass {which} {value} must be between {AIR_MASS_MIN:.1} and {AIR_MASS_MAX:.1}"
        ))
    }
}

fn hour_angle_bound(which: &str, value: f64) -> Validated<f64> {
    if (HOUR_ANGLE_MIN..=HOUR_ANGLE_MAX).contains(&value) {
        valid(value)
    } else {
        invalid(format!(
            "Hour angle {which} {value} must be between {HOUR_ANGLE_MIN:.1} and {HOUR_ANGLE_MAX:.1} hours"
        ))
    }
}

fn ordered(what: &str, min: f64, max: f64) -> Validated<()> {
    if min <= max {
        valid(())
    } else {
        invalid(format!("{what} minimum {min} must be less than or equal to maximum {max}"))
    }
}

// ----------------------------------------------------------------------------
// Inputs
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirMassRangeInput {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourAngleRangeInput {
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationRangeInput {
    pub air_mass: Option<AirMassRangeInput>,
    pub hour_angle: Option<HourAngleRangeInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSetInput {
    pub image_quality: Option<ImageQuality>,
    pub cloud_extinction: Option<CloudExtinction>,
    pub sky_background: Option<SkyBackground>,
    pub water_vapor: Option<WaterVapor>,
    pub elevation_range: Option<ElevationRangeInput>,
}

/// A validated, possibly partial, elevation range change.
///
/// Bounds are range-checked up front; whether a partial change can be merged
/// depends on the range it is applied to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevationRangeEdit {
    AirMass { min: Option<f64>, max: Option<f64> },
    HourAngle { min_hours: Option<f64>, max_hours: Option<f64> },
}

impl ElevationRangeInput {
    pub fn validate(self) -> Validated<ElevationRangeEdit> {
        let air_mass = self.air_mass.map(|a| {
            let checked = validate! {
                min = optional(a.min, |v| air_mass_bound("minimum", v)),
                max = optional(a.max, |v| air_mass_bound("maximum", v)),
                => (min, max)
            };
            checked.and_then(|(min, max)| match (min, max) {
                (Some(lo), Some(hi)) => ordered("Airmass", lo, hi).map(|()| (min, max)),
                _ => Ok((min, max)),
            })
            .map(|(min, max)| ElevationRangeEdit::AirMass { min, max })
        });
        let hour_angle = self.hour_angle.map(|h| {
            let checked = validate! {
                min = optional(h.min_hours, |v| hour_angle_bound("minimum", v)),
                max = optional(h.max_hours, |v| hour_angle_bound("maximum", v)),
                => (min, max)
            };
            checked.and_then(|(min, max)| match (min, max) {
                (Some(lo), Some(hi)) => ordered("Hour angle", lo, hi).map(|()| (min, max)),
                _ => Ok((min, max)),
            })
            .map(|(min_hours, max_hours)| ElevationRangeEdit::HourAngle { min_hours, max_hours })
        });

        at_most_one(
            "elevationRange",
            vec![("airMass", air_mass), ("hourAngle", hour_angle)],
        )?
        .unwrap_or_else(|| invalid("elevationRange: exactly one of airMass, hourAngle must be provided, but none was"))
    }
}

impl ElevationRangeEdit {
    /// Applies the change to the current range.
    ///
    /// A partial change merges with a current range of the same kind; switching
    /// kinds needs both bounds.
    pub fn apply(self, current: ElevationRange) -> Validated<ElevationRange> {
        match (self, current) {
            (ElevationRangeEdit::AirMass { min, max }, ElevationRange::AirMass(cur)) => {
                AirMassRange::new(min.unwrap_or(cur.min), max.unwrap_or(cur.max))
                    .map(ElevationRange::AirMass)
            }
            (ElevationRangeEdit::AirMass { min: Some(min), max: Some(max) }, _) => {
                AirMassRange::new(min, max).map(ElevationRange::AirMass)
            }
            (ElevationRangeEdit::AirMass { .. }, _) => invalid(
                "airMass requires both min and max when the current elevation range is an hour angle range",
            ),
            (
                ElevationRangeEdit::HourAngle { min_hours, max_hours },
                ElevationRange::HourAngle(cur),
            ) => HourAngleRange::new(
                min_hours.unwrap_or(cur.min_hours),
                max_hours.unwrap_or(cur.max_hours),
            )
            .map(ElevationRange::HourAngle),
            (
                ElevationRangeEdit::HourAngle {
                    min_hours: Some(min),
                    max_hours: Some(max),
                },
                _,
            ) => HourAngleRange::new(min, max).map(ElevationRange::HourAngle),
            (ElevationRangeEdit::HourAngle { .. }, _) => invalid(
                "hourAngle requires both minHours and maxHours when the current elevation range is an airmass range",
            ),
        }
    }
}

/// Validated constraint set change; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSetEdit {
    pub image_quality: Option<ImageQuality>,
    pub cloud_extinction: Option<CloudExtinction>,
    pub sky_background: Option<SkyBackground>,
    pub water_vapor: Option<WaterVapor>,
    pub elevation_range: Option<ElevationRangeEdit>,
}

impl ConstraintSetInput {
    pub fn validate(self) -> Validated<ConstraintSetEdit> {
        let elevation_range = optional(self.elevation_range, ElevationRangeInput::validate)?;
        Ok(ConstraintSetEdit {
            image_quality: self.image_quality,
            cloud_extinction: self.cloud_extinction,
            sky_background: self.sky_background,
            water_vapor: self.water_vapor,
            elevation_range,
        })
    }
}

impl ConstraintSetEdit {
    pub fn apply(&self, current: &ConstraintSet) -> Validated<ConstraintSet> {
        let mut cs = current.clone();
        if let Some(iq) = self.image_quality {
            cs = ConstraintSet::image_quality().set(&cs, iq);
        }
        if let Some(ce) = self.cloud_extinction {
            cs = ConstraintSet::cloud_extinction().set(&cs, ce);
        }
        if let Some(sb) = self.sky_background {
            cs = ConstraintSet::sky_background().set(&cs, sb);
        }
        if let Some(wv) = self.water_vapor {
            cs = ConstraintSet::water_vapor().set(&cs, wv);
        }
        if let Some(edit) = self.elevation_range {
            cs = ConstraintSet::elevation_range().try_modify(&cs, |er| edit.apply(er))?;
        }
        Ok(cs)
    }
}
