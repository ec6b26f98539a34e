//! Goals module - definitions, matching, instance recompute and services.

mod due_dates;
mod goals_batch;
mod goals_catalog_service;
mod goals_errors;
mod goals_matcher;
mod goals_model;
mod goals_recompute;
mod goals_service;
mod goals_traits;
mod user_locks;


pub use due_dates::{compute_due_date, DueDate, DueDatePolicy, MissingInput};
pub use goals_batch::{BatchSummary, GoalBatchRunner};
pub use goals_catalog_service::GoalCatalogService;
pub use goals_errors::GoalError;
pub use goals_matcher::{covers_tag, group_goals_by_tag, matches, matching_definitions};
pub use goals_model::{
    BaseGoal, CmeEntity, CmeGoal, Compliance, DescribeGoal, DueDateType, GoalDefinition,
    GoalType, LicenseGoal, LicenseRef, NewUserGoal, RematchOutcome, Scope, Status, UserGoal,
    WellnessGoal,
};
pub use goals_recompute::{
    aggregate_compliance, apply_redeem_offer, calc_license_status, evaluate_cme,
    evaluate_license, recompute_license, recompute_wellness, wellness_levels, CmeContext,
    Evaluation,
};
pub use goals_service::{GoalService, UserRecomputeSummary};
pub use goals_traits::{
    GoalCatalogRepositoryTrait, GoalCatalogServiceTrait, GoalServiceTrait,
    UserGoalRepositoryTrait,
};
pub use user_locks::{UserLockGuard, UserLocks};
