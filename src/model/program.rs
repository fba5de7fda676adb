use crate::core::validated::{Validated, invalid, optional, valid};
use crate::core::{EntityKind, Lens, Nullable, ProgramId, Result};
use crate::events::EventPayload;
use crate::field_lens;
use crate::storage::{Database, Entity, Existence, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub existence: Existence,
    pub name: Option<String>,
}

impl Program {
    pub fn name() -> Lens<Program, Option<String>> {
        field_lens!(Program, name: Option<String>)
    }
}

impl Entity for Program {
    type Id = ProgramId;

    const KIND: EntityKind = EntityKind::Program;

    fn id(&self) -> ProgramId {
        self.id
    }

    fn existence(&self) -> Existence {
        self.existence
    }

    fn existence_lens() -> Lens<Self, Existence> {
        field_lens!(Program, existence: Existence)
    }

    fn table_lens() -> Lens<Database, Table<ProgramId, Program>> {
        Database::programs()
    }

    fn table(db: &Database) -> &Table<ProgramId, Program> {
        db.program_table()
    }

    fn program_id(&self) -> ProgramId {
        self.id
    }

    fn check_references(&self, _db: &Database) -> Result<()> {
        Ok(())
    }

    fn into_payload(self) -> EventPayload {
        EventPayload::Program(self)
    }
}

fn program_name(name: String) -> Validated<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        invalid("name may not be blank; use null to clear it")
    } else {
        valid(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramInput {
    pub program_id: Option<ProgramId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCreateProgram {
    pub name: Option<String>,
}

impl ValidCreateProgram {
    pub fn build(&self, id: ProgramId) -> Program {
        Program {
            id,
            existence: Existence::Present,
            name: self.name.clone(),
        }
    }
}

impl CreateProgramInput {
    pub fn validate(self) -> Validated<ValidCreateProgram> {
        optional(self.name, program_name).map(|name| ValidCreateProgram { name })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPropertiesInput {
    #[serde(default)]
    pub name: Nullable<String>,
    pub existence: Option<Existence>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramEdit {
    pub name: Nullable<String>,
    pub existence: Option<Existence>,
}

impl ProgramPropertiesInput {
    pub fn validate(self) -> Validated<ProgramEdit> {
        let name = self.name.map(program_name).transpose()?;
        Ok(ProgramEdit {
            name,
            existence: self.existence,
        })
    }
}

impl ProgramEdit {
    pub fn apply(&self, program: &Program) -> Validated<Program> {
        let name = self.name.clone();
        let mut next = Program::name().modify(program, |current| name.apply(current));
        if let Some(existence) = self.existence {
            next = next.with_existence(existence);
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSelectInput {
    pub program_ids: Vec<ProgramId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProgramInput {
    pub select: ProgramSelectInput,
    pub patch: ProgramPropertiesInput,
}
