//! License domain models.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::EXPIRING_CUTOFF_DAYS;

/// A provider's license for one (state, license type).
///
/// An uninitialized license has no expiration date yet; it is created as a
/// placeholder when a license goal is assigned and filled in by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub user_id: String,
    pub state: String,
    pub license_type: String,
    pub expire_date: Option<DateTime<Utc>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl License {
    pub fn is_uninitialized(&self) -> bool {
        self.expire_date.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expire_date {
            Some(expire) => expire < now,
            None => true,
        }
    }

    /// Display label, e.g. "Medical Board|CA|2025-06-30".
    pub fn display_label(&self) -> String {
        match self.expire_date {
            Some(expire) => format!(
                "{}|{}|{}",
                self.license_type,
                self.state,
                expire.format("%Y-%m-%d")
            ),
            None => format!("{}|{}|expireDate unset", self.license_type, self.state),
        }
    }
}

/// Input model for creating a license
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLicense {
    pub user_id: String,
    pub state: String,
    pub license_type: String,
    pub expire_date: Option<DateTime<Utc>>,
}

impl NewLicense {
    pub fn uninitialized(
        user_id: impl Into<String>,
        state: impl Into<String>,
        license_type: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            state: state.into(),
            license_type: license_type.into(),
            expire_date: None,
        }
    }
}

/// Picks the license a goal for (state, license type) should track: the
/// latest initialized one, otherwise an uninitialized placeholder.
pub fn select_license<'a>(
    licenses: &'a [License],
    state: &str,
    license_type: &str,
) -> Option<&'a License> {
    let candidates = licenses
        .iter()
        .filter(|l| l.state == state && l.license_type == license_type);

    let mut initialized: Option<&License> = None;
    let mut placeholder: Option<&License> = None;
    for license in candidates {
        match license.expire_date {
            Some(expire) => {
                if initialized
                    .and_then(|current| current.expire_date)
                    .map_or(true, |current| expire > current)
                {
                    initialized = Some(license);
                }
            }
            None => {
                if placeholder.is_none() {
                    placeholder = Some(license);
                }
            }
        }
    }
    initialized.or(placeholder)
}

/// A user's licenses grouped by how urgently they need renewing.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatusBuckets {
    /// Uninitialized or past their expiration date
    pub expired: Vec<License>,
    /// Expiring within the cutoff window
    pub expiring: Vec<License>,
    pub current: Vec<License>,
}

/// Partitions the latest license per (state, license type) into expired,
/// expiring and current buckets.
pub fn partition_by_status(licenses: &[License], now: DateTime<Utc>) -> LicenseStatusBuckets {
    let expiring_cutoff = now + Duration::days(EXPIRING_CUTOFF_DAYS);

    let keys: BTreeSet<(&str, &str)> = licenses
        .iter()
        .map(|l| (l.state.as_str(), l.license_type.as_str()))
        .collect();

    let mut buckets = LicenseStatusBuckets::default();
    for (state, license_type) in keys {
        let Some(license) = select_license(licenses, state, license_type) else {
            continue;
        };
        match license.expire_date {
            Some(expire) if expire >= now && expire <= expiring_cutoff => {
                buckets.expiring.push(license.clone())
            }
            Some(expire) if expire > expiring_cutoff => buckets.current.push(license.clone()),
            _ => buckets.expired.push(license.clone()),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn license(id: &str, state: &str, expire: Option<DateTime<Utc>>) -> License {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().naive_utc();
        License {
            id: id.to_string(),
            user_id: "u1".to_string(),
            state: state.to_string(),
            license_type: "Medical Board".to_string(),
            expire_date: expire,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_select_license_prefers_latest_initialized() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let licenses = vec![
            license("a", "CA", None),
            license("b", "CA", Some(now + Duration::days(10))),
            license("c", "CA", Some(now + Duration::days(400))),
            license("d", "NY", Some(now + Duration::days(900))),
        ];
        let selected = select_license(&licenses, "CA", "Medical Board").unwrap();
        assert_eq!(selected.id, "c");
    }

    #[test]
    fn test_select_license_falls_back_to_placeholder() {
        let licenses = vec![license("a", "CA", None)];
        let selected = select_license(&licenses, "CA", "Medical Board").unwrap();
        assert!(selected.is_uninitialized());
        assert!(select_license(&licenses, "TX", "Medical Board").is_none());
    }

    #[test]
    fn test_partition_by_status() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let licenses = vec![
            license("a", "CA", Some(now - Duration::days(1))),
            license("b", "NY", Some(now + Duration::days(30))),
            license("c", "TX", Some(now + Duration::days(365))),
            license("d", "WA", None),
        ];
        let buckets = partition_by_status(&licenses, now);
        let ids = |v: &Vec<License>| v.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.expired), vec!["a", "d"]);
        assert_eq!(ids(&buckets.expiring), vec!["b"]);
        assert_eq!(ids(&buckets.current), vec!["c"]);
    }
}
