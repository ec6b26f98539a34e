//! Database models for goal definitions.
//!
//! A definition is one `goals` row plus exactly one row in the extension
//! table of its category.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::str::FromStr;

use cmetrack_core::goals::{
    BaseGoal, CmeEntity, CmeGoal, DueDateType, GoalDefinition, GoalType, LicenseGoal, Scope,
    WellnessGoal,
};
use cmetrack_core::utils::MonthDay;

use crate::errors::StorageError;
use crate::utils::{decode_decimal, decode_set, encode_set};

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct GoalDB {
    pub id: String,
    pub goal_type: String,
    pub is_active: bool,
    pub due_date_type: String,
    pub interval_years: Option<String>,
    pub degrees: Option<String>,
    pub specialties: Option<String>,
    pub sub_specialties: Option<String>,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::license_goals)]
#[diesel(primary_key(goal_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct LicenseGoalDB {
    pub goal_id: String,
    pub title: String,
    pub state: String,
    pub license_type: String,
    pub cme_tag_restriction: Option<String>,
    pub days_before_due: i64,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::cme_goals)]
#[diesel(primary_key(goal_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CmeGoalDB {
    pub goal_id: String,
    pub entity_type: String,
    pub entity_name: String,
    pub cme_tag: Option<String>,
    pub map_null_tag_to_specialty: bool,
    pub license_goal_id: Option<String>,
    pub credits_required: String,
    pub due_month: Option<i32>,
    pub due_day: Option<i32>,
    pub eligible_credit_types: String,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::wellness_goals)]
#[diesel(primary_key(goal_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct WellnessGoalDB {
    pub goal_id: String,
    pub hospital: String,
    pub title: String,
    pub due_month: Option<i32>,
    pub due_day: Option<i32>,
}

impl GoalDB {
    pub fn parsed_goal_type(&self) -> Result<GoalType, StorageError> {
        GoalType::from_str(&self.goal_type).map_err(|e| StorageError::corrupt("goal_type", e))
    }
}

/// Category row of a definition.
#[derive(Debug, Clone)]
pub enum ExtensionDB {
    License(LicenseGoalDB),
    Cme(CmeGoalDB),
    Wellness(WellnessGoalDB),
}

fn encode_scope(scope: &Scope<String>) -> Result<Option<String>, StorageError> {
    scope.values().map(encode_set).transpose()
}

fn decode_scope(column: &'static str, raw: Option<&str>) -> Result<Scope<String>, StorageError> {
    match raw {
        None => Ok(Scope::Any),
        Some(raw) => Ok(Scope::restricted(decode_set(column, raw)?)),
    }
}

fn encode_month_day(month_day: Option<MonthDay>) -> (Option<i32>, Option<i32>) {
    match month_day {
        Some(md) => (Some(md.month() as i32), Some(md.day() as i32)),
        None => (None, None),
    }
}

fn decode_month_day(
    month: Option<i32>,
    day: Option<i32>,
) -> Result<Option<MonthDay>, StorageError> {
    match (month, day) {
        (Some(month), Some(day)) => {
            let month = u32::try_from(month).map_err(|e| StorageError::corrupt("due_month", e))?;
            let day = u32::try_from(day).map_err(|e| StorageError::corrupt("due_day", e))?;
            MonthDay::new(month, day)
                .map(Some)
                .map_err(|e| StorageError::corrupt("due_day", e))
        }
        _ => Ok(None),
    }
}

/// Splits a definition into its base and extension rows.
pub fn to_rows(
    definition: &GoalDefinition,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
) -> Result<(GoalDB, ExtensionDB), StorageError> {
    let base = definition.base();
    let goal = GoalDB {
        id: base.id.clone(),
        goal_type: base.goal_type.as_str().to_string(),
        is_active: base.is_active,
        due_date_type: base.due_date_type.as_str().to_string(),
        interval_years: base.interval_years.map(|years| years.to_string()),
        degrees: encode_scope(&base.degrees)?,
        specialties: encode_scope(&base.specialties)?,
        sub_specialties: encode_scope(&base.sub_specialties)?,
        notes: base.notes.clone(),
        created_at,
        updated_at,
    };

    let extension = match definition {
        GoalDefinition::License(g) => ExtensionDB::License(LicenseGoalDB {
            goal_id: base.id.clone(),
            title: g.title.clone(),
            state: g.state.clone(),
            license_type: g.license_type.clone(),
            cme_tag_restriction: g.cme_tag_restriction.clone(),
            days_before_due: g.days_before_due,
        }),
        GoalDefinition::Cme(g) => {
            let (due_month, due_day) = encode_month_day(g.due_month_day);
            ExtensionDB::Cme(CmeGoalDB {
                goal_id: base.id.clone(),
                entity_type: g.entity.kind().to_string(),
                entity_name: g.entity.name().to_string(),
                cme_tag: g.cme_tag.clone(),
                map_null_tag_to_specialty: g.map_null_tag_to_specialty,
                license_goal_id: g.license_goal_id.clone(),
                credits_required: g.credits_required.to_string(),
                due_month,
                due_day,
                eligible_credit_types: encode_set(&g.eligible_credit_types)?,
            })
        }
        GoalDefinition::Wellness(g) => {
            let (due_month, due_day) = encode_month_day(g.due_month_day);
            ExtensionDB::Wellness(WellnessGoalDB {
                goal_id: base.id.clone(),
                hospital: g.hospital.clone(),
                title: g.title.clone(),
                due_month,
                due_day,
            })
        }
    };
    Ok((goal, extension))
}

/// Rebuilds a definition from its rows.
pub fn from_rows(goal: GoalDB, extension: ExtensionDB) -> Result<GoalDefinition, StorageError> {
    let base = BaseGoal {
        goal_type: goal.parsed_goal_type()?,
        due_date_type: DueDateType::from_str(&goal.due_date_type)
            .map_err(|e| StorageError::corrupt("due_date_type", e))?,
        interval_years: goal
            .interval_years
            .as_deref()
            .map(|raw| decode_decimal("interval_years", raw))
            .transpose()?,
        degrees: decode_scope("degrees", goal.degrees.as_deref())?,
        specialties: decode_scope("specialties", goal.specialties.as_deref())?,
        sub_specialties: decode_scope("sub_specialties", goal.sub_specialties.as_deref())?,
        is_active: goal.is_active,
        notes: goal.notes,
        id: goal.id,
    };

    let definition = match extension {
        ExtensionDB::License(row) => GoalDefinition::License(LicenseGoal {
            base,
            title: row.title,
            state: row.state,
            license_type: row.license_type,
            cme_tag_restriction: row.cme_tag_restriction,
            days_before_due: row.days_before_due,
        }),
        ExtensionDB::Cme(row) => GoalDefinition::Cme(CmeGoal {
            base,
            entity: CmeEntity::from_parts(&row.entity_type, row.entity_name)
                .map_err(|e| StorageError::corrupt("entity_type", e))?,
            cme_tag: row.cme_tag,
            map_null_tag_to_specialty: row.map_null_tag_to_specialty,
            license_goal_id: row.license_goal_id,
            credits_required: decode_decimal("credits_required", &row.credits_required)?,
            due_month_day: decode_month_day(row.due_month, row.due_day)?,
            eligible_credit_types: decode_set("eligible_credit_types", &row.eligible_credit_types)?,
        }),
        ExtensionDB::Wellness(row) => GoalDefinition::Wellness(WellnessGoal {
            base,
            hospital: row.hospital,
            title: row.title,
            due_month_day: decode_month_day(row.due_month, row.due_day)?,
        }),
    };
    Ok(definition)
}
