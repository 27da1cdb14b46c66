pub mod db;
pub mod models;

pub use db::{Database, DatabaseStats, Offer};
pub use models::{
    AcademicRecord, Application, CodingProfileEntry, CodingRequirement, Company, Placement,
    Requirements, Role, SelectionStatus, Student,
};
