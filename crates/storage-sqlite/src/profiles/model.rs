use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use cmetrack_core::goals::Compliance;
use cmetrack_core::profiles::{Profile, ProfileCmeTag};

use crate::errors::StorageError;
use crate::utils::{decode_set, encode_set};

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ProfileDB {
    pub user_id: String,
    pub degrees: String,
    pub specialties: String,
    pub sub_specialties: String,
    pub states: String,
    pub hospitals: String,
    pub specialty_tags: String,
    pub sub_specialties_required: bool,
    pub birth_date: Option<NaiveDate>,
    pub country: Option<String>,
    pub joined_at: NaiveDateTime,
    pub goals_enabled: bool,
    pub compliance: Option<i16>,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::profile_cme_tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProfileCmeTagDB {
    pub user_id: String,
    pub tag: String,
    pub is_active: bool,
}

impl ProfileDB {
    pub fn from_domain(profile: &Profile, now: NaiveDateTime) -> Result<Self, StorageError> {
        Ok(ProfileDB {
            user_id: profile.user_id.clone(),
            degrees: encode_set(&profile.degrees)?,
            specialties: encode_set(&profile.specialties)?,
            sub_specialties: encode_set(&profile.sub_specialties)?,
            states: encode_set(&profile.states)?,
            hospitals: encode_set(&profile.hospitals)?,
            specialty_tags: encode_set(&profile.specialty_tags)?,
            sub_specialties_required: profile.sub_specialties_required,
            birth_date: profile.birth_date,
            country: profile.country.clone(),
            joined_at: profile.joined_at.naive_utc(),
            goals_enabled: profile.goals_enabled,
            compliance: profile.compliance.map(|c| c.as_i16()),
            updated_at: now,
        })
    }

    pub fn into_domain(self, tags: Vec<ProfileCmeTagDB>) -> Result<Profile, StorageError> {
        Ok(Profile {
            degrees: decode_set("degrees", &self.degrees)?,
            specialties: decode_set("specialties", &self.specialties)?,
            sub_specialties: decode_set("sub_specialties", &self.sub_specialties)?,
            states: decode_set("states", &self.states)?,
            hospitals: decode_set("hospitals", &self.hospitals)?,
            specialty_tags: decode_set("specialty_tags", &self.specialty_tags)?,
            cme_tags: tags
                .into_iter()
                .map(|t| ProfileCmeTag {
                    tag: t.tag,
                    is_active: t.is_active,
                })
                .collect(),
            compliance: self
                .compliance
                .map(Compliance::try_from)
                .transpose()
                .map_err(|e| StorageError::corrupt("compliance", e))?,
            sub_specialties_required: self.sub_specialties_required,
            birth_date: self.birth_date,
            country: self.country,
            joined_at: self.joined_at.and_utc(),
            goals_enabled: self.goals_enabled,
            user_id: self.user_id,
        })
    }
}
