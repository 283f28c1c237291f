//! In-memory CRM client for testing.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use url::Url;

use crate::client::CrmClient;
use crate::envelope::RecordResult;
use crate::error::CrmError;

/// How an attachment was delivered to the CRM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Uploaded from a local file with this name.
    File(String),
    /// Linked by URL.
    Url(String),
}

/// An attachment recorded by [`InMemoryCrmClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttachment {
    pub module: String,
    pub record_id: String,
    pub source: AttachmentSource,
}

#[derive(Debug, Default)]
struct InMemoryCrmState {
    records: HashMap<String, Vec<(String, Map<String, Value>)>>,
    attachments: Vec<RecordedAttachment>,
    updates: Vec<(String, String, Map<String, Value>)>,
    calls: usize,
    next_id: u64,
    failing_modules: HashSet<String>,
    rejected_records: HashSet<(String, usize)>,
    fail_on_attach: bool,
    fail_on_update: bool,
}

/// In-memory CRM client for testing.
///
/// Assigns sequential ids (`CRM-0001`, ...) and records every call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrmClient {
    state: Arc<RwLock<InMemoryCrmState>>,
}

impl InMemoryCrmClient {
    /// Creates a new in-memory CRM client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures record creation in `module` to fail as a whole.
    pub fn set_fail_on_create(&self, module: &str, fail: bool) {
        let mut state = self.state.write().unwrap();
        if fail {
            state.failing_modules.insert(module.to_string());
        } else {
            state.failing_modules.remove(module);
        }
    }

    /// Configures the record at `index` of every batch in `module` to be
    /// rejected while the rest of the batch succeeds.
    pub fn reject_record(&self, module: &str, index: usize) {
        self.state
            .write()
            .unwrap()
            .rejected_records
            .insert((module.to_string(), index));
    }

    /// Configures attachment calls to fail.
    pub fn set_fail_on_attach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_attach = fail;
    }

    /// Configures update calls to fail.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_update = fail;
    }

    /// Returns the total number of calls made, including failed ones.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().calls
    }

    /// Returns the number of records created in `module`.
    pub fn record_count(&self, module: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .records
            .get(module)
            .map_or(0, Vec::len)
    }

    /// Returns the fields of a created record.
    pub fn record(&self, module: &str, id: &str) -> Option<Map<String, Value>> {
        self.state
            .read()
            .unwrap()
            .records
            .get(module)?
            .iter()
            .find(|(record_id, _)| record_id == id)
            .map(|(_, fields)| fields.clone())
    }

    /// Returns all attachments made to records of `module`.
    pub fn attachments(&self, module: &str) -> Vec<RecordedAttachment> {
        self.state
            .read()
            .unwrap()
            .attachments
            .iter()
            .filter(|a| a.module == module)
            .cloned()
            .collect()
    }

    /// Returns all updates as `(module, record_id, fields)`.
    pub fn updates(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.state.read().unwrap().updates.clone()
    }

    fn record_attachment(
        &self,
        module: &str,
        record_id: &str,
        source: AttachmentSource,
    ) -> Result<(), CrmError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if state.fail_on_attach {
            return Err(CrmError::Rejected("attachment refused".to_string()));
        }

        state.attachments.push(RecordedAttachment {
            module: module.to_string(),
            record_id: record_id.to_string(),
            source,
        });
        Ok(())
    }
}

#[async_trait]
impl CrmClient for InMemoryCrmClient {
    async fn create_records(
        &self,
        module: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordResult>, CrmError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if state.failing_modules.contains(module) {
            return Err(CrmError::Rejected(format!("{module} unavailable")));
        }

        let mut results = Vec::with_capacity(records.len());
        for (index, fields) in records.into_iter().enumerate() {
            if state.rejected_records.contains(&(module.to_string(), index)) {
                results.push(RecordResult::Failed {
                    code: "INVALID_DATA".to_string(),
                    message: "record rejected".to_string(),
                });
                continue;
            }

            state.next_id += 1;
            let id = format!("CRM-{:04}", state.next_id);
            state
                .records
                .entry(module.to_string())
                .or_default()
                .push((id.clone(), fields));
            results.push(RecordResult::Created(id));
        }

        Ok(results)
    }

    async fn attach_file(
        &self,
        module: &str,
        record_id: &str,
        file: &Path,
    ) -> Result<(), CrmError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record_attachment(module, record_id, AttachmentSource::File(name))
    }

    async fn attach_url(&self, module: &str, record_id: &str, url: &Url) -> Result<(), CrmError> {
        self.record_attachment(module, record_id, AttachmentSource::Url(url.to_string()))
    }

    async fn update_record(
        &self,
        module: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Value, CrmError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if state.fail_on_update {
            return Err(CrmError::Rejected("update refused".to_string()));
        }

        state
            .updates
            .push((module.to_string(), record_id.to_string(), fields));

        Ok(json!({
            "data": [{"code": "SUCCESS", "status": "success", "details": {"id": record_id}}]
        }))
    }
}
