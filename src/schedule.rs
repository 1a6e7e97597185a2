use std::{fs::File, io, path::Path};

use crate::error::{SitelapseError, SitelapseResult};

/// One raw schedule row. Start/end are in schedule time units (typically
/// days); only `Activity`, `Start` and `End` are mandatory columns, the rest
/// feed optional visualization modes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleRecord {
    #[serde(rename = "Activity")]
    pub activity: String,
    #[serde(rename = "WBS", default)]
    pub wbs: Option<String>,
    #[serde(rename = "Company", default)]
    pub company: Option<String>,
    #[serde(rename = "ActivityType", default)]
    pub activity_type: Option<String>,
    #[serde(rename = "Start")]
    pub start: f64,
    #[serde(rename = "End")]
    pub end: f64,
    #[serde(rename = "Resources", default)]
    pub resources: Option<f64>,
}

pub fn read_schedule(path: &Path) -> SitelapseResult<Vec<ScheduleRecord>> {
    let file = File::open(path).map_err(|e| {
        SitelapseError::config(format!("failed to open schedule '{}': {e}", path.display()))
    })?;
    read_schedule_from(file).map_err(|e| match e {
        SitelapseError::Serde(msg) => {
            SitelapseError::serde(format!("schedule '{}': {msg}", path.display()))
        }
        other => other,
    })
}

pub fn read_schedule_from<R: io::Read>(reader: R) -> SitelapseResult<Vec<ScheduleRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize::<ScheduleRecord>() {
        let record = row.map_err(|e| SitelapseError::serde(e.to_string()))?;
        if record.activity.is_empty() {
            return Err(SitelapseError::validation(
                "schedule row has an empty Activity field",
            ));
        }
        for (label, value) in [("Start", record.start), ("End", record.end)] {
            if !value.is_finite() {
                return Err(SitelapseError::validation(format!(
                    "activity '{}' has a non-finite {label} value",
                    record.activity
                )));
            }
        }
        if let Some(res) = record.resources
            && !res.is_finite()
        {
            return Err(SitelapseError::validation(format!(
                "activity '{}' has a non-finite Resources value",
                record.activity
            )));
        }
        records.push(record);
    }
    Ok(records)
}

/// Chronological integrity: every record must end no earlier than it starts.
pub fn validate_chronology(records: &[ScheduleRecord]) -> SitelapseResult<()> {
    for record in records {
        if record.end < record.start {
            return Err(SitelapseError::validation(format!(
                "activity '{}' ends before it starts ({} < {})",
                record.activity, record.end, record.start
            )));
        }
    }
    Ok(())
}

/// Keep only records whose dot-separated WBS path contains `root` as a
/// segment, and rewrite kept paths to start at that segment. Records without
/// a WBS field never match.
pub fn filter_to_root(
    records: Vec<ScheduleRecord>,
    root: &str,
) -> SitelapseResult<Vec<ScheduleRecord>> {
    let kept: Vec<ScheduleRecord> = records
        .into_iter()
        .filter_map(|mut record| {
            let wbs = record.wbs.as_deref()?;
            let rerooted = reroot_wbs(wbs, root)?;
            record.wbs = Some(rerooted);
            Some(record)
        })
        .collect();

    if kept.is_empty() {
        return Err(SitelapseError::validation(format!(
            "no schedule records fall under WBS root '{root}'"
        )));
    }
    Ok(kept)
}

fn reroot_wbs(wbs: &str, root: &str) -> Option<String> {
    let parts: Vec<&str> = wbs.split('.').collect();
    let idx = parts.iter().position(|p| *p == root)?;
    Some(parts[idx..].join("."))
}
