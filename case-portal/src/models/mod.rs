pub mod content;
pub mod user;

pub use content::{BusinessCase, BusinessCaseInput, Chapter, ChapterInput, Language, Voice};
pub use user::{AdminCaller, CallerIdentity, EstablishedSession, Profile, Role};
