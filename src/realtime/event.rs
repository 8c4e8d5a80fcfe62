use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use crate::cache::QueryKey;

/// Tables whose changes are streamed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    #[serde(rename = "job_roles")]
    JobRoles,
    #[serde(rename = "job_applications")]
    Applications,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::JobRoles, Table::Applications];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::JobRoles => "job_roles",
            Table::Applications => "job_applications",
        }
    }

    /// Phoenix topic for this table's channel.
    pub fn topic(&self) -> String {
        format!("realtime:{}", self.as_str())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change as delivered by the realtime server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record: Option<JsonValue>,
    pub old_record: Option<JsonValue>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            record: None,
            old_record: None,
        }
    }

    pub fn with_record(mut self, record: JsonValue) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_old_record(mut self, old_record: JsonValue) -> Self {
        self.old_record = Some(old_record);
        self
    }

    /// Row id from the new row, or the old one for deletes.
    pub fn record_id(&self) -> Option<Uuid> {
        [&self.record, &self.old_record]
            .into_iter()
            .flatten()
            .find_map(|row| row.get("id")?.as_str()?.parse().ok())
    }

    /// Cache keys made stale by this change.
    pub fn invalidation_keys(&self) -> Vec<QueryKey> {
        match self.table {
            Table::JobRoles => {
                let mut keys = vec![
                    QueryKey::job_roles(),
                    QueryKey::jobs(),
                    QueryKey::pending_jobs(),
                    QueryKey::public_jobs(),
                    QueryKey::stats(),
                    QueryKey::employee_jobs(),
                    QueryKey::employee_stats(),
                ];
                if let Some(id) = self.record_id() {
                    keys.push(QueryKey::job(id));
                }
                keys
            }
            Table::Applications => vec![
                QueryKey::applications(),
                QueryKey::my_applications(),
                QueryKey::all_job_applications(),
                QueryKey::technical_results_all(),
                QueryKey::stats(),
            ],
        }
    }

    pub fn message(&self) -> &'static str {
        match (self.table, self.kind) {
            (Table::JobRoles, ChangeKind::Insert) => "New job posted",
            (Table::JobRoles, ChangeKind::Update) => "Job updated",
            (Table::JobRoles, ChangeKind::Delete) => "Job removed",
            (Table::Applications, ChangeKind::Insert) => "New application received",
            (Table::Applications, ChangeKind::Update) => "Application updated",
            (Table::Applications, ChangeKind::Delete) => "Application withdrawn",
        }
    }

    pub fn notice(&self) -> RealtimeNotice {
        RealtimeNotice {
            table: self.table,
            kind: self.kind,
            record_id: self.record_id(),
            message: self.message().to_string(),
        }
    }
}

/// What a subscriber callback receives for each change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeNotice {
    pub table: Table,
    pub kind: ChangeKind,
    pub record_id: Option<Uuid>,
    pub message: String,
}

#[derive(Deserialize)]
struct ChangeData {
    #[serde(rename = "type", alias = "eventType")]
    kind: ChangeKind,
    #[serde(default, alias = "new")]
    record: Option<JsonValue>,
    #[serde(default, alias = "old")]
    old_record: Option<JsonValue>,
}

/// Parses the payload of a `postgres_changes` frame.
///
/// Current servers nest the change under `data`; older ones put `eventType`,
/// `new` and `old` directly in the payload. Empty row objects are dropped.
pub fn parse_postgres_change(table: Table, payload: &JsonValue) -> Option<ChangeEvent> {
    let data = payload.get("data").unwrap_or(payload);
    let change: ChangeData = serde_json::from_value(data.clone()).ok()?;
    let non_empty = |row: Option<JsonValue>| {
        row.filter(|r| r.as_object().map(|o| !o.is_empty()).unwrap_or(false))
    };
    Some(ChangeEvent {
        table,
        kind: change.kind,
        record: non_empty(change.record),
        old_record: non_empty(change.old_record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JOB_ID: &str = "3d7b1f0a-5b8e-4c1c-9e0f-2a4d6c8e0b11";

    #[test]
    fn parses_nested_change_payload() {
        let payload = json!({
            "data": {
                "schema": "public",
                "table": "job_roles",
                "type": "UPDATE",
                "record": { "id": JOB_ID, "status": "approved" },
                "old_record": { "id": JOB_ID },
            },
            "ids": [1]
        });
        let event = parse_postgres_change(Table::JobRoles, &payload).unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.record_id(), Some(JOB_ID.parse().unwrap()));
        assert_eq!(event.message(), "Job updated");
    }

    #[test]
    fn parses_flat_legacy_payload_and_delete_ids() {
        let payload = json!({
            "eventType": "DELETE",
            "new": {},
            "old": { "id": JOB_ID },
        });
        let event = parse_postgres_change(Table::Applications, &payload).unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert!(event.record.is_none());
        assert_eq!(event.record_id(), Some(JOB_ID.parse().unwrap()));
        assert_eq!(event.message(), "Application withdrawn");
    }

    #[test]
    fn job_changes_bust_job_lists_and_detail() {
        let id: Uuid = JOB_ID.parse().unwrap();
        let keys = ChangeEvent::new(Table::JobRoles, ChangeKind::Insert)
            .with_record(json!({ "id": JOB_ID }))
            .invalidation_keys();
        for expected in [
            QueryKey::job_roles(),
            QueryKey::jobs(),
            QueryKey::pending_jobs(),
            QueryKey::public_jobs(),
            QueryKey::job(id),
        ] {
            assert!(keys.contains(&expected), "missing {expected}");
        }

        let keys = ChangeEvent::new(Table::Applications, ChangeKind::Insert).invalidation_keys();
        assert!(keys.contains(&QueryKey::applications()));
        assert!(!keys.contains(&QueryKey::jobs()));
    }

    #[test]
    fn unknown_payloads_are_ignored() {
        assert!(parse_postgres_change(Table::JobRoles, &json!({ "status": "ok" })).is_none());
    }
}
