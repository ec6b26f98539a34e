//! Licenses module - per-provider license records and expiry helpers.

mod licenses_model;
mod licenses_traits;

pub use licenses_model::{
    partition_by_status, select_license, License, LicenseStatusBuckets, NewLicense,
};
pub use licenses_traits::LicenseRepositoryTrait;
