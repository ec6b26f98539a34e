//! Matching of goal definitions against a provider profile.

use std::collections::BTreeMap;

use log::warn;

use crate::goals::goals_model::{
    BaseGoal, CmeEntity, CmeGoal, GoalDefinition, LicenseGoal, WellnessGoal,
};
use crate::profiles::Profile;

/// Returns true if the definition is active and applies to the profile.
pub fn matches(definition: &GoalDefinition, profile: &Profile) -> bool {
    if !definition.is_active() {
        return false;
    }
    match definition {
        GoalDefinition::License(goal) => matches_license(goal, profile),
        GoalDefinition::Cme(goal) => matches_cme(goal, profile),
        GoalDefinition::Wellness(goal) => matches_wellness(goal, profile),
    }
}

/// Filters the active definitions that apply to the profile.
pub fn matching_definitions<'a>(
    definitions: &'a [GoalDefinition],
    profile: &Profile,
) -> Vec<&'a GoalDefinition> {
    definitions
        .iter()
        .filter(|definition| matches(definition, profile))
        .collect()
}

/// Degree, specialty and sub-specialty scopes must all intersect the profile.
fn matches_base(base: &BaseGoal, profile: &Profile) -> bool {
    base.degrees.intersects(&profile.degrees)
        && base.specialties.intersects(&profile.specialties)
        && base.sub_specialties.intersects(&profile.sub_specialties)
}

fn matches_license(goal: &LicenseGoal, profile: &Profile) -> bool {
    if !profile.states.contains(&goal.state) {
        return false;
    }
    if let Some(tag) = &goal.cme_tag_restriction {
        if !profile.has_active_tag(tag) {
            return false;
        }
    }
    matches_base(&goal.base, profile)
}

fn matches_cme(goal: &CmeGoal, profile: &Profile) -> bool {
    if !goal.is_valid() {
        warn!(
            "Skipping invalid CME goal {} ({:?})",
            goal.base.id, goal.base.due_date_type
        );
        return false;
    }
    let entity_match = match &goal.entity {
        CmeEntity::Board(_) => true,
        CmeEntity::State(state) => profile.states.contains(state),
        CmeEntity::Hospital(hospital) => profile.hospitals.contains(hospital),
    };
    if !entity_match || !matches_base(&goal.base, profile) {
        return false;
    }
    match &goal.cme_tag {
        None => true,
        Some(tag) => profile.has_active_tag(tag),
    }
}

fn matches_wellness(goal: &WellnessGoal, profile: &Profile) -> bool {
    profile.hospitals.contains(&goal.hospital) && matches_base(&goal.base, profile)
}

/// Groups matched CME definitions by the tag their instance tracks.
///
/// Tagged definitions group under their tag. Untagged definitions that map to
/// the specialty fan out to every specialty tag of the profile; the others
/// form the `None` ("any topic") group.
pub fn group_goals_by_tag<'a>(
    profile: &Profile,
    goals: &[&'a CmeGoal],
) -> BTreeMap<Option<String>, Vec<&'a CmeGoal>> {
    let mut grouped: BTreeMap<Option<String>, Vec<&'a CmeGoal>> = BTreeMap::new();
    for &goal in goals {
        match &goal.cme_tag {
            Some(tag) => grouped.entry(Some(tag.clone())).or_default().push(goal),
            None if goal.map_null_tag_to_specialty => {
                if profile.specialty_tags.is_empty() {
                    warn!(
                        "CME goal {} maps to specialty but user {} has no specialty tags",
                        goal.base.id, profile.user_id
                    );
                    continue;
                }
                for tag in &profile.specialty_tags {
                    grouped.entry(Some(tag.clone())).or_default().push(goal);
                }
            }
            None => grouped.entry(None).or_default().push(goal),
        }
    }
    grouped
}

/// True if `goal` still lands in the `tag` group for this profile, the same
/// way [`group_goals_by_tag`] would place it.
pub fn covers_tag(goal: &CmeGoal, profile: &Profile, tag: Option<&str>) -> bool {
    match (goal.cme_tag.as_deref(), tag) {
        (Some(goal_tag), Some(tag)) => goal_tag == tag,
        (None, Some(tag)) => {
            goal.map_null_tag_to_specialty && profile.specialty_tags.contains(tag)
        }
        (None, None) => !goal.map_null_tag_to_specialty,
        (Some(_), None) => false,
    }
}
