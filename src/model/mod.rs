pub mod constraints;
pub mod observation;
pub mod program;
pub mod science_mode;
pub mod target;

pub use constraints::{
    AirMassRange, CloudExtinction, ConstraintSet, ElevationRange, HourAngleRange, ImageQuality,
    SkyBackground, WaterVapor,
};
pub use observation::{
    CreateObservationInput, EditAsterismPatchInput, EditAsterismsInput, EditObservationInput,
    ObsActiveStatus, ObsStatus, Observation, ObservationPropertiesInput, ObservationSelectInput,
    TargetEnvironment,
};
pub use program::{CreateProgramInput, EditProgramInput, Program, ProgramPropertiesInput, ProgramSelectInput};
pub use science_mode::ScienceMode;
pub use target::{
    CreateTargetInput, EditTargetInput, Target, TargetPropertiesInput, TargetSelectInput, Tracking,
};
