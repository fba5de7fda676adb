use crate::core::validated::{Validated, exactly_one, invalid, optional, required, valid};
use crate::core::Nullable;
use crate::validate;
use serde::{Deserialize, Serialize};

pub const MIN_WAVELENGTH_NM: f64 = 350.0;
pub const MAX_WAVELENGTH_NM: f64 = 1100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GmosNorthGrating {
    #[serde(rename = "B1200_G5301")]
    B1200G5301,
    #[serde(rename = "R831_G5302")]
    R831G5302,
    #[serde(rename = "B480_G5309")]
    B480G5309,
    #[serde(rename = "R400_G5305")]
    R400G5305,
    #[serde(rename = "R150_G5308")]
    R150G5308,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GmosSouthGrating {
    #[serde(rename = "B1200_G5321")]
    B1200G5321,
    #[serde(rename = "R831_G5322")]
    R831G5322,
    #[serde(rename = "B480_G5327")]
    B480G5327,
    #[serde(rename = "R400_G5325")]
    R400G5325,
    #[serde(rename = "R150_G5326")]
    R150G5326,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GmosFilter {
    #[serde(rename = "G_PRIME")]
    GPrime,
    #[serde(rename = "R_PRIME")]
    RPrime,
    #[serde(rename = "I_PRIME")]
    IPrime,
    #[serde(rename = "Z_PRIME")]
    ZPrime,
    #[serde(rename = "GG455")]
    Gg455,
    #[serde(rename = "OG515")]
    Og515,
    #[serde(rename = "RG610")]
    Rg610,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GmosFpu {
    #[serde(rename = "LONG_SLIT_0_25")]
    LongSlit0_25,
    #[serde(rename = "LONG_SLIT_0_50")]
    LongSlit0_50,
    #[serde(rename = "LONG_SLIT_0_75")]
    LongSlit0_75,
    #[serde(rename = "LONG_SLIT_1_00")]
    LongSlit1_00,
    #[serde(rename = "LONG_SLIT_1_50")]
    LongSlit1_50,
    #[serde(rename = "LONG_SLIT_2_00")]
    LongSlit2_00,
    #[serde(rename = "LONG_SLIT_5_00")]
    LongSlit5_00,
}

/// GMOS long-slit configuration, parameterised by the site's grating set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmosLongSlit<G> {
    pub grating: G,
    pub filter: Option<GmosFilter>,
    pub fpu: GmosFpu,
    pub central_wavelength_nm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScienceMode {
    GmosNorthLongSlit(GmosLongSlit<GmosNorthGrating>),
    GmosSouthLongSlit(GmosLongSlit<GmosSouthGrating>),
}

impl ScienceMode {
    pub fn name(&self) -> &'static str {
        match self {
            ScienceMode::GmosNorthLongSlit(_) => "gmosNorthLongSlit",
            ScienceMode::GmosSouthLongSlit(_) => "gmosSouthLongSlit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmosLongSlitInput<G> {
    pub grating: Option<G>,
    #[serde(default)]
    pub filter: Nullable<GmosFilter>,
    pub fpu: Option<GmosFpu>,
    pub central_wavelength_nm: Option<f64>,
}

impl<G> Default for GmosLongSlitInput<G> {
    fn default() -> Self {
        Self {
            grating: None,
            filter: Nullable::Absent,
            fpu: None,
            central_wavelength_nm: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScienceModeInput {
    pub gmos_north_long_slit: Option<GmosLongSlitInput<GmosNorthGrating>>,
    pub gmos_south_long_slit: Option<GmosLongSlitInput<GmosSouthGrating>>,
}

/// Validated partial long-slit change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmosLongSlitEdit<G> {
    pub grating: Option<G>,
    pub filter: Option<Option<GmosFilter>>,
    pub fpu: Option<GmosFpu>,
    pub central_wavelength_nm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScienceModeEdit {
    GmosNorthLongSlit(GmosLongSlitEdit<GmosNorthGrating>),
    GmosSouthLongSlit(GmosLongSlitEdit<GmosSouthGrating>),
}

fn wavelength(nm: f64) -> Validated<f64> {
    if (MIN_WAVELENGTH_NM..=MAX_WAVELENGTH_NM).contains(&nm) {
        valid(nm)
    } else {
        invalid(format!(
            "centralWavelengthNm {nm} must be between {MIN_WAVELENGTH_NM} and {MAX_WAVELENGTH_NM}"
        ))
    }
}

impl<G: Copy> GmosLongSlitInput<G> {
    fn validate(self) -> Validated<GmosLongSlitEdit<G>> {
        let central_wavelength_nm = optional(self.central_wavelength_nm, wavelength)?;
        Ok(GmosLongSlitEdit {
            grating: self.grating,
            filter: self.filter.into_edit(),
            fpu: self.fpu,
            central_wavelength_nm,
        })
    }
}

impl<G: Copy> GmosLongSlitEdit<G> {
    fn merge(self, current: Option<GmosLongSlit<G>>, mode: &str) -> Validated<GmosLongSlit<G>> {
        match current {
            Some(cur) => Ok(GmosLongSlit {
                grating: self.grating.unwrap_or(cur.grating),
                filter: self.filter.unwrap_or(cur.filter),
                fpu: self.fpu.unwrap_or(cur.fpu),
                central_wavelength_nm: self.central_wavelength_nm.unwrap_or(cur.central_wavelength_nm),
            }),
            None => validate! {
                grating = required(self.grating, &format!("{mode}.grating")),
                fpu = required(self.fpu, &format!("{mode}.fpu")),
                central_wavelength_nm = required(
                    self.central_wavelength_nm,
                    &format!("{mode}.centralWavelengthNm"),
                ),
                => GmosLongSlit {
                    grating,
                    filter: self.filter.flatten(),
                    fpu,
                    central_wavelength_nm,
                }
            },
        }
    }
}

impl ScienceModeInput {
    pub fn validate(self) -> Validated<ScienceModeEdit> {
        exactly_one(
            "scienceMode",
            vec![
                (
                    "gmosNorthLongSlit",
                    self.gmos_north_long_slit
                        .map(|i| i.validate().map(ScienceModeEdit::GmosNorthLongSlit)),
                ),
                (
                    "gmosSouthLongSlit",
                    self.gmos_south_long_slit
                        .map(|i| i.validate().map(ScienceModeEdit::GmosSouthLongSlit)),
                ),
            ],
        )?
    }
}

impl ScienceModeEdit {
    /// Merges with the current mode when it is the same variant, otherwise
    /// requires a complete definition.
    pub fn apply(self, current: Option<&ScienceMode>) -> Validated<ScienceMode> {
        match self {
            ScienceModeEdit::GmosNorthLongSlit(edit) => {
                let cur = match current {
                    Some(ScienceMode::GmosNorthLongSlit(c)) => Some(*c),
                    _ => None,
                };
                edit.merge(cur, "gmosNorthLongSlit").map(ScienceMode::GmosNorthLongSlit)
            }
            ScienceModeEdit::GmosSouthLongSlit(edit) => {
                let cur = match current {
                    Some(ScienceMode::GmosSouthLongSlit(c)) => Some(*c),
                    _ => None,
                };
                edit.merge(cur, "gmosSouthLongSlit").map(ScienceMode::GmosSouthLongSlit)
            }
        }
    }
}
