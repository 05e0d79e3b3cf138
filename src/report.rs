//! JSON report attachments for test runs.
//!
//! Each exchange becomes two titled entries, `[Request] sent at <time>` and
//! `[Response] received at <time>`, which report viewers can render next to
//! the test that produced them.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::executor::ExchangeRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub title: String,
    pub value: Value,
}

impl ReportEntry {
    pub fn new(title: impl Into<String>, value: impl Serialize) -> Result<Self> {
        Ok(Self {
            title: title.into(),
            value: serde_json::to_value(value).context("serializing report entry")?,
        })
    }

    pub fn from_record(record: &ExchangeRecord) -> Result<Vec<Self>> {
        Ok(vec![
            Self::new(
                format!("[Request] sent at {}", record.request.time),
                &record.request,
            )?,
            Self::new(
                format!("[Response] received at {}", record.response.time),
                &record.response,
            )?,
        ])
    }

    /// Lists the assertions a test is about to run so they show up even when one fails.
    pub fn assertions<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: "[Assertions]".to_string(),
            value: Value::Array(
                lines
                    .into_iter()
                    .map(|line| Value::String(line.into()))
                    .collect(),
            ),
        }
    }
}

pub fn write_report(path: &Path, entries: &[ReportEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let rendered = serde_json::to_string_pretty(entries).context("rendering report")?;
    fs::write(path, rendered).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}
