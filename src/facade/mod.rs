mod odb;

pub use odb::Odb;
