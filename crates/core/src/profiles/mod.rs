//! Profiles module - the provider attributes goals are matched against.

mod profiles_model;
mod profiles_traits;

pub use profiles_model::{Profile, ProfileCmeTag};
pub use profiles_traits::ProfileRepositoryTrait;
