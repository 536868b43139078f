//! Editable local record file.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::constants::remote::SYNC_COMMIT_MESSAGE;
use crate::data::ClientRecord;
use crate::dates::{format_iso, normalize_to_iso, parse_display_date, parse_due_date};
use crate::errors::WatchError;
use crate::parser::{parse_record_bytes, render_records};
use crate::sync::{PushOutcome, RemoteSyncClient};
use crate::task::DetachedTask;
use crate::transport::fs::{read_optional, write_atomic};

/// Result of a local save.
#[derive(Debug)]
pub struct SaveOutcome {
    /// File that was written.
    pub path: PathBuf,
    /// Best-effort remote push started after the save, if any.
    pub push: Option<DetachedTask<PushOutcome>>,
}

/// In-memory copy of the local record file with whole-file saves.
///
/// Dates are kept ISO at rest. A record is addressed by company name plus due
/// date, since the same company may hold several licenses.
pub struct ClientStore {
    path: PathBuf,
    records: Vec<ClientRecord>,
    sync: Option<RemoteSyncClient>,
}

impl ClientStore {
    /// Load `path`, creating it with only a header when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let path = path.into();
        let records = match read_optional(&path)? {
            Some(bytes) => parse_record_bytes(&bytes)?
                .into_iter()
                .map(|record| {
                    let iso = normalize_to_iso(&record.raw_due);
                    ClientRecord::new(record.company, iso)
                })
                .collect(),
            None => {
                write_atomic(&path, render_records(&[])?.as_bytes())?;
                info!("[license-watch:store] created {}", path.display());
                Vec::new()
            }
        };
        Ok(Self {
            path,
            records,
            sync: None,
        })
    }

    /// Start a detached remote push after every successful save.
    pub fn with_remote_push(mut self, sync: RemoteSyncClient) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Records in file order.
    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. `due` must be `DD/MM/YYYY` or empty.
    pub fn add(&mut self, company: &str, due: &str) -> Result<&ClientRecord, WatchError> {
        let record = validated(company, due)?;
        self.records.push(record);
        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// Replace the record identified by `company` and `due`.
    ///
    /// With `new_due` absent the stored date is kept as is, even when it does
    /// not parse.
    pub fn edit(
        &mut self,
        company: &str,
        due: &str,
        new_company: &str,
        new_due: Option<&str>,
    ) -> Result<&ClientRecord, WatchError> {
        let idx = self.position(company, due)?;
        let replacement = match new_due {
            Some(new_due) => validated(new_company, new_due)?,
            None => {
                let kept = self.records[idx].raw_due.clone();
                ClientRecord::new(validated_company(new_company)?, kept)
            }
        };
        self.records[idx] = replacement;
        Ok(&self.records[idx])
    }

    /// Remove and return the record identified by `company` and `due`.
    pub fn remove(&mut self, company: &str, due: &str) -> Result<ClientRecord, WatchError> {
        let idx = self.position(company, due)?;
        Ok(self.records.remove(idx))
    }

    /// Replace the local file, then start the optional remote push.
    ///
    /// The push never fails the save: a thread that cannot be started is
    /// logged, and the push outcome is only reported through the task.
    pub fn save(&self) -> Result<SaveOutcome, WatchError> {
        let rendered = render_records(&self.records)?;
        write_atomic(&self.path, rendered.as_bytes())?;
        info!(
            "[license-watch:store] saved {} records to {}",
            self.records.len(),
            self.path.display()
        );

        let push = match &self.sync {
            Some(sync) => match sync.push_detached(rendered.into_bytes(), SYNC_COMMIT_MESSAGE) {
                Ok(task) => Some(task),
                Err(err) => {
                    warn!("[license-watch:store] could not start remote push: {err}");
                    None
                }
            },
            None => None,
        };
        Ok(SaveOutcome {
            path: self.path.clone(),
            push,
        })
    }

    fn position(&self, company: &str, due: &str) -> Result<usize, WatchError> {
        let company = company.trim();
        let due = due.trim();
        let wanted = parse_due_date(due);
        self.records
            .iter()
            .position(|record| {
                record.company == company
                    && match wanted {
                        Some(date) => record.due_date() == Some(date),
                        None => record.raw_due == due,
                    }
            })
            .ok_or_else(|| WatchError::RecordNotFound {
                company: company.to_string(),
                due: due.to_string(),
            })
    }
}

fn validated_company(company: &str) -> Result<&str, WatchError> {
    let company = company.trim();
    if company.is_empty() {
        return Err(WatchError::InvalidInput("company name must not be empty".into()));
    }
    Ok(company)
}

fn validated(company: &str, due: &str) -> Result<ClientRecord, WatchError> {
    let company = validated_company(company)?;
    let due = due.trim();
    let iso = if due.is_empty() {
        String::new()
    } else {
        let date = parse_display_date(due).ok_or_else(|| {
            WatchError::InvalidInput(format!("due date '{due}' must use DD/MM/YYYY"))
        })?;
        format_iso(date)
    };
    Ok(ClientRecord::new(company, iso))
}
