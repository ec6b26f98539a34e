//! Goal domain models.
//!
//! Goal definitions are administrator-authored reference data: a category
//! agnostic [`BaseGoal`] owned by one of the category extensions
//! ([`LicenseGoal`], [`CmeGoal`], [`WellnessGoal`]). A [`UserGoal`] is the
//! concrete per-user instance that gets recomputed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DAYS_PER_YEAR, MIN_CME_CREDITS};
use crate::errors::ValidationError;
use crate::licenses::NewLicense;
use crate::utils::{days_left, MonthDay};

const INTERVAL_ERROR: &str = "interval in years must be specified for recurring due date types";

/// Goal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalType {
    License,
    #[serde(rename = "CME")]
    Cme,
    Wellness,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::License => "License",
            GoalType::Cme => "CME",
            GoalType::Wellness => "Wellness",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "License" => Ok(GoalType::License),
            "CME" => Ok(GoalType::Cme),
            "Wellness" => Ok(GoalType::Wellness),
            other => Err(ValidationError::invalid_field(
                "goalType",
                format!("unknown goal type '{}'", other),
            )),
        }
    }
}

/// How a goal's due date is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DueDateType {
    /// Due immediately, once
    OneOff,
    /// Recurring, due on a fixed month/day
    RecurFixedDate,
    /// Recurring, due at any time counting back over the interval
    RecurAnyTimeInInterval,
    /// Recurring, due on the user's birth date
    RecurOnBirthDate,
    /// Recurring, due on the license expiration date
    RecurOnLicenseExpiry,
}

impl DueDateType {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, DueDateType::OneOff)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DueDateType::OneOff => "ONE_OFF",
            DueDateType::RecurFixedDate => "RECUR_FIXED_DATE",
            DueDateType::RecurAnyTimeInInterval => "RECUR_ANY_TIME_IN_INTERVAL",
            DueDateType::RecurOnBirthDate => "RECUR_ON_BIRTH_DATE",
            DueDateType::RecurOnLicenseExpiry => "RECUR_ON_LICENSE_EXPIRY",
        }
    }
}

impl FromStr for DueDateType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE_OFF" => Ok(DueDateType::OneOff),
            "RECUR_FIXED_DATE" => Ok(DueDateType::RecurFixedDate),
            "RECUR_ANY_TIME_IN_INTERVAL" => Ok(DueDateType::RecurAnyTimeInInterval),
            "RECUR_ON_BIRTH_DATE" => Ok(DueDateType::RecurOnBirthDate),
            "RECUR_ON_LICENSE_EXPIRY" => Ok(DueDateType::RecurOnLicenseExpiry),
            other => Err(ValidationError::invalid_field(
                "dueDateType",
                format!("unknown due date type '{}'", other),
            )),
        }
    }
}

/// Eligibility scope of a goal attribute. `Any` matches every profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "camelCase")]
pub enum Scope<T: Ord> {
    #[default]
    Any,
    Restricted(BTreeSet<T>),
}

impl<T: Ord> Scope<T> {
    /// Builds a restricted scope; an empty selection means `Any`.
    pub fn restricted(values: impl IntoIterator<Item = T>) -> Self {
        let values: BTreeSet<T> = values.into_iter().collect();
        if values.is_empty() {
            Scope::Any
        } else {
            Scope::Restricted(values)
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Scope::Any)
    }

    pub fn values(&self) -> Option<&BTreeSet<T>> {
        match self {
            Scope::Any => None,
            Scope::Restricted(values) => Some(values),
        }
    }

    pub fn allows(&self, value: &T) -> bool {
        match self {
            Scope::Any => true,
            Scope::Restricted(values) => values.contains(value),
        }
    }

    /// True if the scope is `Any` or shares at least one value with `values`.
    pub fn intersects(&self, values: &BTreeSet<T>) -> bool {
        match self {
            Scope::Any => true,
            Scope::Restricted(allowed) => !allowed.is_disjoint(values),
        }
    }
}

impl<T: Ord> From<Option<BTreeSet<T>>> for Scope<T> {
    fn from(values: Option<BTreeSet<T>>) -> Self {
        values.map_or(Scope::Any, |set| Scope::restricted(set))
    }
}

impl Scope<String> {
    /// Display label, e.g. "Any" or "MD, DO".
    pub fn label(&self) -> String {
        match self {
            Scope::Any => "Any".to_string(),
            Scope::Restricted(values) => values
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// The category-agnostic part of a goal definition.
///
/// Definitions are deactivated rather than deleted so that assigned
/// instances keep their reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseGoal {
    pub id: String,
    pub goal_type: GoalType,
    pub is_active: bool,
    pub due_date_type: DueDateType,
    /// Interval in years for recurring goals
    pub interval_years: Option<Decimal>,
    pub degrees: Scope<String>,
    pub specialties: Scope<String>,
    pub sub_specialties: Scope<String>,
    pub notes: String,
}

impl BaseGoal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.due_date_type.is_recurring() {
            match self.interval_years {
                Some(years) if years > Decimal::ZERO => {}
                _ => {
                    return Err(ValidationError::invalid_field(
                        "intervalYears",
                        INTERVAL_ERROR,
                    ))
                }
            }
        }
        if let Some(years) = self.interval_years {
            if years.is_sign_negative() {
                return Err(ValidationError::invalid_field(
                    "intervalYears",
                    "must not be negative",
                ));
            }
        }
        Ok(())
    }

    fn expect_type(&self, goal_type: GoalType) -> Result<(), ValidationError> {
        if self.goal_type != goal_type {
            return Err(ValidationError::invalid_field(
                "goalType",
                format!("expected {}, got {}", goal_type, self.goal_type),
            ));
        }
        Ok(())
    }

    /// Interval length in days, used for progress display.
    pub fn interval_days(&self) -> Option<Decimal> {
        self.interval_years
            .filter(|years| *years > Decimal::ZERO)
            .map(|years| years * Decimal::from(DAYS_PER_YEAR))
    }
}

/// Display capability shared by every goal category.
pub trait DescribeGoal {
    fn title(&self) -> String;
    fn due_date_label(&self) -> String;
}

fn due_date_label_for(due_date_type: DueDateType, month_day: Option<MonthDay>) -> String {
    match due_date_type {
        DueDateType::OneOff => "Due immediately".to_string(),
        DueDateType::RecurFixedDate => match month_day {
            Some(md) => format!("Every year on {}", md.label()),
            None => "Fixed date (unset)".to_string(),
        },
        DueDateType::RecurAnyTimeInInterval => "Any time within the interval".to_string(),
        DueDateType::RecurOnBirthDate => "On your birth date".to_string(),
        DueDateType::RecurOnLicenseExpiry => "On license expiration date".to_string(),
    }
}

/// License renewal requirement for one (state, license type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseGoal {
    pub base: BaseGoal,
    pub title: String,
    pub state: String,
    pub license_type: String,
    /// When set, only profiles with this active tag match
    pub cme_tag_restriction: Option<String>,
    /// Days before expiration at which the goal switches to in progress
    pub days_before_due: i64,
}

impl LicenseGoal {
    pub fn default_title(&self) -> String {
        format!("{} License ({})", self.license_type, self.state)
    }

    /// Fills in the default title if none was given.
    pub fn with_default_title(mut self) -> Self {
        if self.title.trim().is_empty() {
            self.title = self.default_title();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.expect_type(GoalType::License)?;
        if self.base.interval_years.is_none() {
            return Err(ValidationError::invalid_field(
                "intervalYears",
                "duration of license in years is required",
            ));
        }
        self.base.validate()?;
        if self.base.due_date_type != DueDateType::RecurOnLicenseExpiry {
            return Err(ValidationError::invalid_field(
                "dueDateType",
                "license goals must recur on the license expiration date",
            ));
        }
        if self.state.trim().is_empty() {
            return Err(ValidationError::MissingField("state".to_string()));
        }
        if self.license_type.trim().is_empty() {
            return Err(ValidationError::MissingField("licenseType".to_string()));
        }
        if self.days_before_due < 0 {
            return Err(ValidationError::invalid_field(
                "daysBeforeDue",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

impl DescribeGoal for LicenseGoal {
    fn title(&self) -> String {
        if self.title.is_empty() {
            self.default_title()
        } else {
            self.title.clone()
        }
    }

    fn due_date_label(&self) -> String {
        due_date_label_for(self.base.due_date_type, None)
    }
}

/// Issuer of a CME requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name")]
pub enum CmeEntity {
    Board(String),
    State(String),
    Hospital(String),
}

impl CmeEntity {
    pub fn name(&self) -> &str {
        match self {
            CmeEntity::Board(name) | CmeEntity::State(name) | CmeEntity::Hospital(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CmeEntity::Board(_) => "BOARD",
            CmeEntity::State(_) => "STATE",
            CmeEntity::Hospital(_) => "HOSPITAL",
        }
    }

    pub fn from_parts(kind: &str, name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        match kind {
            "BOARD" => Ok(CmeEntity::Board(name)),
            "STATE" => Ok(CmeEntity::State(name)),
            "HOSPITAL" => Ok(CmeEntity::Hospital(name)),
            other => Err(ValidationError::invalid_field(
                "entityType",
                format!("unknown entity type '{}'", other),
            )),
        }
    }
}

/// Continuing-education credit requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmeGoal {
    pub base: BaseGoal,
    pub entity: CmeEntity,
    /// None derives the tag from the profile's specialties
    pub cme_tag: Option<String>,
    pub map_null_tag_to_specialty: bool,
    /// License goal whose expiration date this goal follows
    pub license_goal_id: Option<String>,
    pub credits_required: Decimal,
    pub due_month_day: Option<MonthDay>,
    pub eligible_credit_types: BTreeSet<String>,
}

impl CmeGoal {
    /// True if the definition carries the data its due-date type needs.
    pub fn is_valid(&self) -> bool {
        match self.base.due_date_type {
            DueDateType::RecurOnLicenseExpiry => self.license_goal_id.is_some(),
            DueDateType::RecurFixedDate => self.due_month_day.is_some_and(|md| md.is_valid()),
            _ => true,
        }
    }

    /// True if untagged and fanned out to each profile specialty tag.
    pub fn fans_out(&self) -> bool {
        self.cme_tag.is_none() && self.map_null_tag_to_specialty
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.expect_type(GoalType::Cme)?;
        self.base.validate()?;
        if self.entity.name().trim().is_empty() {
            return Err(ValidationError::invalid_field(
                "entity",
                format!("{} must be selected", self.entity.kind().to_lowercase()),
            ));
        }
        if self.credits_required < MIN_CME_CREDITS {
            return Err(ValidationError::invalid_field(
                "creditsRequired",
                format!("must be at least {}", MIN_CME_CREDITS),
            ));
        }
        if let Some(md) = self.due_month_day {
            if !md.is_valid() {
                return Err(ValidationError::invalid_field(
                    "dueDay",
                    "must be a valid day for the selected month",
                ));
            }
        }
        let uses_license = self.base.due_date_type == DueDateType::RecurOnLicenseExpiry;
        match (uses_license, self.license_goal_id.is_some()) {
            (true, false) => {
                return Err(ValidationError::invalid_field(
                    "licenseGoalId",
                    "required when the due date follows the license expiration date",
                ))
            }
            (false, true) => {
                return Err(ValidationError::invalid_field(
                    "licenseGoalId",
                    "must be empty unless the due date follows the license expiration date",
                ))
            }
            _ => {}
        }
        if self.base.due_date_type == DueDateType::RecurFixedDate && self.due_month_day.is_none()
        {
            return Err(ValidationError::invalid_field(
                "dueMonthDay",
                "required when the due date is a fixed month/day",
            ));
        }
        Ok(())
    }
}

impl DescribeGoal for CmeGoal {
    fn title(&self) -> String {
        let tag = self.cme_tag.as_deref().unwrap_or("Any Topic");
        format!("{} credits in {}", self.credits_required.normalize(), tag)
    }

    fn due_date_label(&self) -> String {
        due_date_label_for(self.base.due_date_type, self.due_month_day)
    }
}

/// Hospital wellness task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessGoal {
    pub base: BaseGoal,
    pub hospital: String,
    pub title: String,
    pub due_month_day: Option<MonthDay>,
}

impl WellnessGoal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base.expect_type(GoalType::Wellness)?;
        self.base.validate()?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()));
        }
        if self.hospital.trim().is_empty() {
            return Err(ValidationError::MissingField("hospital".to_string()));
        }
        match self.base.due_date_type {
            DueDateType::OneOff | DueDateType::RecurOnBirthDate => Ok(()),
            DueDateType::RecurFixedDate => match self.due_month_day {
                Some(md) if md.is_valid() => Ok(()),
                _ => Err(ValidationError::invalid_field(
                    "dueMonthDay",
                    "required when the due date is a fixed month/day",
                )),
            },
            other => Err(ValidationError::invalid_field(
                "dueDateType",
                format!("{} is not allowed for wellness goals", other.as_str()),
            )),
        }
    }
}

impl DescribeGoal for WellnessGoal {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn due_date_label(&self) -> String {
        due_date_label_for(self.base.due_date_type, self.due_month_day)
    }
}

/// A goal definition of any category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum GoalDefinition {
    License(LicenseGoal),
    Cme(CmeGoal),
    Wellness(WellnessGoal),
}

impl GoalDefinition {
    pub fn base(&self) -> &BaseGoal {
        match self {
            GoalDefinition::License(goal) => &goal.base,
            GoalDefinition::Cme(goal) => &goal.base,
            GoalDefinition::Wellness(goal) => &goal.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseGoal {
        match self {
            GoalDefinition::License(goal) => &mut goal.base,
            GoalDefinition::Cme(goal) => &mut goal.base,
            GoalDefinition::Wellness(goal) => &mut goal.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn goal_type(&self) -> GoalType {
        match self {
            GoalDefinition::License(_) => GoalType::License,
            GoalDefinition::Cme(_) => GoalType::Cme,
            GoalDefinition::Wellness(_) => GoalType::Wellness,
        }
    }

    pub fn is_active(&self) -> bool {
        self.base().is_active
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GoalDefinition::License(goal) => goal.validate(),
            GoalDefinition::Cme(goal) => goal.validate(),
            GoalDefinition::Wellness(goal) => goal.validate(),
        }
    }

    pub fn as_license(&self) -> Option<&LicenseGoal> {
        match self {
            GoalDefinition::License(goal) => Some(goal),
            _ => None,
        }
    }

    pub fn as_cme(&self) -> Option<&CmeGoal> {
        match self {
            GoalDefinition::Cme(goal) => Some(goal),
            _ => None,
        }
    }

    pub fn as_wellness(&self) -> Option<&WellnessGoal> {
        match self {
            GoalDefinition::Wellness(goal) => Some(goal),
            _ => None,
        }
    }
}

impl DescribeGoal for GoalDefinition {
    fn title(&self) -> String {
        match self {
            GoalDefinition::License(goal) => goal.title(),
            GoalDefinition::Cme(goal) => goal.title(),
            GoalDefinition::Wellness(goal) => goal.title(),
        }
    }

    fn due_date_label(&self) -> String {
        match self {
            GoalDefinition::License(goal) => goal.due_date_label(),
            GoalDefinition::Cme(goal) => goal.due_date_label(),
            GoalDefinition::Wellness(goal) => goal.due_date_label(),
        }
    }
}

/// Progress of a goal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    PastDue,
    InProgress,
    /// For license goals this means "not yet urgent"
    Completed,
}

impl Status {
    pub fn as_i16(&self) -> i16 {
        match self {
            Status::PastDue => 0,
            Status::InProgress => 1,
            Status::Completed => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::PastDue => "Past Due",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl TryFrom<i16> for Status {
    type Error = ValidationError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::PastDue),
            1 => Ok(Status::InProgress),
            2 => Ok(Status::Completed),
            other => Err(ValidationError::invalid_field(
                "status",
                format!("unknown status {}", other),
            )),
        }
    }
}

/// Compliance level. Variants are ordered by severity: the lowest value is
/// the most severe and wins when levels are aggregated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compliance {
    NonCompliant,
    MarginalCompliant,
    IncompleteProfile,
    IncompleteLicense,
    Compliant,
}

impl Compliance {
    pub const ALL: [Compliance; 5] = [
        Compliance::NonCompliant,
        Compliance::MarginalCompliant,
        Compliance::IncompleteProfile,
        Compliance::IncompleteLicense,
        Compliance::Compliant,
    ];

    pub fn as_i16(&self) -> i16 {
        match self {
            Compliance::NonCompliant => 0,
            Compliance::MarginalCompliant => 1,
            Compliance::IncompleteProfile => 2,
            Compliance::IncompleteLicense => 3,
            Compliance::Compliant => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Compliance::NonCompliant => "Non-Compliant",
            Compliance::MarginalCompliant => "Marginally Compliant",
            Compliance::IncompleteProfile => "Incomplete Profile",
            Compliance::IncompleteLicense => "Incomplete License",
            Compliance::Compliant => "Compliant",
        }
    }
}

impl TryFrom<i16> for Compliance {
    type Error = ValidationError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Compliance::ALL
            .into_iter()
            .find(|c| c.as_i16() == value)
            .ok_or_else(|| {
                ValidationError::invalid_field("compliance", format!("unknown level {}", value))
            })
    }
}

/// A goal assigned to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGoal {
    pub id: String,
    pub user_id: String,
    /// Primary definition
    pub goal_id: String,
    pub goal_type: GoalType,
    pub cme_tag: Option<String>,
    pub license_id: Option<String>,
    pub status: Status,
    pub compliance: Compliance,
    pub due_date: DateTime<Utc>,
    pub credits_due: Option<Decimal>,
    pub credits_earned: Option<Decimal>,
    /// CME definitions consolidated into this instance
    pub cme_goal_ids: BTreeSet<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl UserGoal {
    /// Display title: the tag for CME instances, otherwise the definition title.
    pub fn title(&self, definition: Option<&GoalDefinition>) -> String {
        match self.goal_type {
            GoalType::Cme => self
                .cme_tag
                .clone()
                .unwrap_or_else(|| "Any Topic".to_string()),
            _ => definition.map(|d| d.title()).unwrap_or_default(),
        }
    }

    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        days_left(self.due_date, now)
    }

    /// Progress in percent (0-100).
    ///
    /// License and wellness goals measure elapsed time over the interval; CME
    /// goals measure credits earned against credits still due.
    pub fn progress(&self, definition: Option<&GoalDefinition>, now: DateTime<Utc>) -> i64 {
        let percent = match self.goal_type {
            GoalType::Cme => {
                let earned = self.credits_earned.unwrap_or(Decimal::ZERO);
                let due = self.credits_due.unwrap_or(Decimal::ZERO);
                if due <= Decimal::ZERO {
                    Decimal::ONE_HUNDRED
                } else {
                    Decimal::ONE_HUNDRED * earned / (earned + due)
                }
            }
            _ => match definition.and_then(|d| d.base().interval_days()) {
                Some(total) => {
                    Decimal::ONE_HUNDRED * (total - Decimal::from(self.days_left(now))) / total
                }
                None => Decimal::ZERO,
            },
        };
        percent
            .trunc()
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .try_into()
            .unwrap_or(0)
    }

    pub fn is_open(&self) -> bool {
        self.status != Status::Completed
    }

    /// Points the instance at a new primary definition and linked set.
    /// Returns true if either changed.
    pub fn check_update(&mut self, primary_goal_id: &str, linked: &BTreeSet<String>) -> bool {
        let mut changed = false;
        if self.goal_id != primary_goal_id {
            self.goal_id = primary_goal_id.to_string();
            changed = true;
        }
        if &self.cme_goal_ids != linked {
            self.cme_goal_ids = linked.clone();
            changed = true;
        }
        changed
    }
}

/// Input model for creating a goal instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserGoal {
    pub user_id: String,
    pub goal_id: String,
    pub goal_type: GoalType,
    pub cme_tag: Option<String>,
    /// Filled in by the repository for license instances
    pub license_id: Option<String>,
    pub status: Status,
    pub compliance: Compliance,
    pub due_date: DateTime<Utc>,
    pub credits_due: Option<Decimal>,
    pub credits_earned: Option<Decimal>,
    pub cme_goal_ids: BTreeSet<String>,
}

/// License a new license goal instance should point to.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseRef {
    Existing(String),
    /// Created in the same write as the instance
    New(NewLicense),
}

/// What a rematch or assignment pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchOutcome {
    pub created: Vec<UserGoal>,
    pub updated: usize,
    pub removed: usize,
}

impl RematchOutcome {
    pub fn merge(&mut self, other: RematchOutcome) {
        self.created.extend(other.created);
        self.updated += other.updated;
        self.removed += other.removed;
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated == 0 && self.removed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn base(goal_type: GoalType, due_date_type: DueDateType) -> BaseGoal {
        BaseGoal {
            id: "g1".to_string(),
            goal_type,
            is_active: true,
            due_date_type,
            interval_years: Some(dec!(2)),
            degrees: Scope::Any,
            specialties: Scope::Any,
            sub_specialties: Scope::Any,
            notes: String::new(),
        }
    }

    fn cme(due_date_type: DueDateType) -> CmeGoal {
        CmeGoal {
            base: base(GoalType::Cme, due_date_type),
            entity: CmeEntity::State("CA".to_string()),
            cme_tag: Some("Opioids".to_string()),
            map_null_tag_to_specialty: false,
            license_goal_id: None,
            credits_required: dec!(10),
            due_month_day: None,
            eligible_credit_types: BTreeSet::new(),
        }
    }

    fn license_goal() -> LicenseGoal {
        LicenseGoal {
            base: base(GoalType::License, DueDateType::RecurOnLicenseExpiry),
            title: String::new(),
            state: "CA".to_string(),
            license_type: "Medical Board".to_string(),
            cme_tag_restriction: None,
            days_before_due: 90,
        }
    }

    #[test]
    fn test_compliance_ordering_most_severe_first() {
        assert!(Compliance::NonCompliant < Compliance::MarginalCompliant);
        assert!(Compliance::IncompleteProfile < Compliance::IncompleteLicense);
        assert!(Compliance::IncompleteLicense < Compliance::Compliant);
        let worst = [Compliance::Compliant, Compliance::IncompleteLicense]
            .into_iter()
            .min();
        assert_eq!(worst, Some(Compliance::IncompleteLicense));
        assert_eq!(Compliance::try_from(3i16).unwrap(), Compliance::IncompleteLicense);
        assert!(Compliance::try_from(9i16).is_err());
    }

    #[test]
    fn test_scope_restricted_empty_is_any() {
        let scope: Scope<String> = Scope::restricted(Vec::new());
        assert!(scope.is_any());
        let scope = Scope::restricted(["MD".to_string()]);
        assert!(scope.intersects(&BTreeSet::from(["MD".to_string(), "DO".to_string()])));
        assert!(!scope.intersects(&BTreeSet::from(["RN".to_string()])));
        assert_eq!(scope.label(), "MD");
    }

    #[test]
    fn test_recurring_goal_requires_interval() {
        let mut goal = cme(DueDateType::RecurAnyTimeInInterval);
        goal.base.interval_years = None;
        assert!(goal.validate().is_err());
        goal.base.interval_years = Some(dec!(0));
        assert!(goal.validate().is_err());
        goal.base.interval_years = Some(dec!(1.5));
        assert!(goal.validate().is_ok());
    }

    #[test]
    fn test_cme_validity_by_due_date_type() {
        let mut goal = cme(DueDateType::RecurFixedDate);
        assert!(!goal.is_valid());
        assert!(goal.validate().is_err());
        goal.due_month_day = Some(MonthDay::new(2, 29).unwrap());
        assert!(goal.is_valid());
        assert!(goal.validate().is_ok());

        let mut goal = cme(DueDateType::RecurOnLicenseExpiry);
        assert!(!goal.is_valid());
        goal.license_goal_id = Some("lg1".to_string());
        assert!(goal.is_valid());
        assert!(goal.validate().is_ok());
    }

    #[test]
    fn test_cme_minimum_credits() {
        let mut goal = cme(DueDateType::RecurAnyTimeInInterval);
        goal.credits_required = dec!(0.05);
        assert!(goal.validate().is_err());
        goal.credits_required = dec!(0.1);
        assert!(goal.validate().is_ok());
    }

    #[test]
    fn test_license_goal_default_title_and_type() {
        let goal = license_goal().with_default_title();
        assert_eq!(goal.title, "Medical Board License (CA)");
        assert!(goal.validate().is_ok());

        let mut goal = license_goal();
        goal.base.due_date_type = DueDateType::RecurFixedDate;
        assert!(goal.validate().is_err());
    }

    #[test]
    fn test_wellness_due_date_types() {
        let mut goal = WellnessGoal {
            base: base(GoalType::Wellness, DueDateType::OneOff),
            hospital: "General".to_string(),
            title: "Flu shot".to_string(),
            due_month_day: None,
        };
        assert!(goal.validate().is_ok());
        goal.base.due_date_type = DueDateType::RecurAnyTimeInInterval;
        assert!(goal.validate().is_err());
        goal.base.due_date_type = DueDateType::RecurFixedDate;
        assert!(goal.validate().is_err());
        goal.due_month_day = Some(MonthDay::new(10, 1).unwrap());
        assert!(goal.validate().is_ok());
        assert_eq!(goal.due_date_label(), "Every year on 10/1");
    }

    #[test]
    fn test_user_goal_title_and_progress() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let definition = GoalDefinition::License(license_goal().with_default_title());
        let mut user_goal = UserGoal {
            id: "ug1".to_string(),
            user_id: "u1".to_string(),
            goal_id: "g1".to_string(),
            goal_type: GoalType::License,
            cme_tag: None,
            license_id: Some("l1".to_string()),
            status: Status::Completed,
            compliance: Compliance::Compliant,
            due_date: now + Duration::days(365),
            credits_due: None,
            credits_earned: None,
            cme_goal_ids: BTreeSet::new(),
            created_at: now.naive_utc(),
            updated_at: now.naive_utc(),
        };
        assert_eq!(user_goal.title(Some(&definition)), "Medical Board License (CA)");
        // one of two years elapsed
        assert_eq!(user_goal.progress(Some(&definition), now), 50);

        user_goal.goal_type = GoalType::Cme;
        user_goal.cme_tag = None;
        user_goal.credits_earned = Some(dec!(3));
        user_goal.credits_due = Some(dec!(1));
        assert_eq!(user_goal.title(Some(&definition)), "Any Topic");
        assert_eq!(user_goal.progress(None, now), 75);

        let linked = BTreeSet::from(["g2".to_string(), "g3".to_string()]);
        assert!(user_goal.check_update("g2", &linked));
        assert_eq!(user_goal.goal_id, "g2");
        assert_eq!(user_goal.cme_goal_ids, linked);
        assert!(!user_goal.check_update("g2", &linked));
    }
}
