//! Profile domain models.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::goals::Compliance;

/// Link between a profile and a credit tag.
///
/// Only active links take part in goal matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCmeTag {
    pub tag: String,
    pub is_active: bool,
}

/// The attributes of a provider that goal matching and due dates depend on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub degrees: BTreeSet<String>,
    pub specialties: BTreeSet<String>,
    pub sub_specialties: BTreeSet<String>,
    pub states: BTreeSet<String>,
    pub hospitals: BTreeSet<String>,
    pub cme_tags: Vec<ProfileCmeTag>,
    /// Credit tags named after the declared specialties
    pub specialty_tags: BTreeSet<String>,
    /// True when at least one declared specialty offers sub-specialties
    pub sub_specialties_required: bool,
    pub birth_date: Option<NaiveDate>,
    pub country: Option<String>,
    pub joined_at: DateTime<Utc>,
    /// Set when the user's organization has activated goals
    pub goals_enabled: bool,
    /// Cached aggregate compliance from the last recompute
    pub compliance: Option<Compliance>,
}

impl Profile {
    /// Returns the tags whose profile link is active.
    pub fn active_tags(&self) -> BTreeSet<&str> {
        self.cme_tags
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.tag.as_str())
            .collect()
    }

    pub fn has_active_tag(&self, tag: &str) -> bool {
        self.cme_tags.iter().any(|t| t.is_active && t.tag == tag)
    }

    /// Returns true if every field used for goal matching and due-date
    /// computation is populated.
    pub fn is_complete_for_goals(&self) -> bool {
        if self.birth_date.is_none() || self.country.as_deref().unwrap_or("").is_empty() {
            return false;
        }
        if self.degrees.is_empty()
            || self.states.is_empty()
            || self.hospitals.is_empty()
            || self.specialties.is_empty()
        {
            return false;
        }
        !(self.sub_specialties_required && self.sub_specialties.is_empty())
    }
}
