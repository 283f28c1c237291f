//! Attaching release forms to CRM records.

use std::path::PathBuf;
use std::sync::Arc;

use crm::{CrmClient, FileFetcher};
use url::Url;

use crate::error::AttachmentError;

/// Attaches documents to CRM records.
///
/// Deal attachments are downloaded into the scratch directory and uploaded as
/// files. Vehicle attachments are linked by URL. Every failure is returned to
/// the caller, which treats it as non-fatal.
#[derive(Clone)]
pub struct AttachmentUploader {
    crm: Arc<dyn CrmClient>,
    fetcher: Arc<dyn FileFetcher>,
    scratch_dir: PathBuf,
}

impl AttachmentUploader {
    pub fn new(
        crm: Arc<dyn CrmClient>,
        fetcher: Arc<dyn FileFetcher>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            crm,
            fetcher,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Downloads `url` and uploads it as a file attachment of the record.
    ///
    /// The scratch copy is removed whether or not the upload succeeds.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn upload(
        &self,
        module: &str,
        record_id: &str,
        url: &Url,
    ) -> Result<(), AttachmentError> {
        let path = self.fetcher.fetch(url, &self.scratch_dir).await?;

        let uploaded = self.crm.attach_file(module, record_id, &path).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch file");
        }

        uploaded?;
        tracing::info!(module, record_id, "file attached");
        Ok(())
    }

    /// Attaches `url` to the record without downloading it.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn link(&self, module: &str, record_id: &str, url: &Url) -> Result<(), AttachmentError> {
        self.crm.attach_url(module, record_id, url).await?;
        tracing::info!(module, record_id, "file linked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm::{
        AttachmentSource, DEALS_MODULE, InMemoryCrmClient, InMemoryFileFetcher, VEHICLES_MODULE,
    };

    fn form_url() -> Url {
        Url::parse("https://files.example.com/forms/release.pdf").unwrap()
    }

    fn scratch_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn upload_attaches_and_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let crm = InMemoryCrmClient::new();
        let uploader = AttachmentUploader::new(
            Arc::new(crm.clone()),
            Arc::new(InMemoryFileFetcher::new()),
            dir.path(),
        );

        uploader.upload(DEALS_MODULE, "D-1", &form_url()).await.unwrap();

        let attachments = crm.attachments(DEALS_MODULE);
        assert_eq!(attachments.len(), 1);
        assert!(matches!(
            &attachments[0].source,
            AttachmentSource::File(name) if name.ends_with("-release.pdf")
        ));
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn failed_upload_still_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let crm = InMemoryCrmClient::new();
        crm.set_fail_on_attach(true);
        let uploader = AttachmentUploader::new(
            Arc::new(crm),
            Arc::new(InMemoryFileFetcher::new()),
            dir.path(),
        );

        let result = uploader.upload(DEALS_MODULE, "D-1", &form_url()).await;
        assert!(matches!(result, Err(AttachmentError::Upload(_))));
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn failed_fetch_makes_no_crm_call() {
        let dir = tempfile::tempdir().unwrap();
        let crm = InMemoryCrmClient::new();
        let fetcher = InMemoryFileFetcher::new();
        fetcher.set_fail_on_fetch(true);
        let uploader = AttachmentUploader::new(Arc::new(crm.clone()), Arc::new(fetcher), dir.path());

        let result = uploader.upload(DEALS_MODULE, "D-1", &form_url()).await;
        assert!(matches!(result, Err(AttachmentError::Fetch(_))));
        assert_eq!(crm.call_count(), 0);
    }

    #[tokio::test]
    async fn link_attaches_by_url() {
        let crm = InMemoryCrmClient::new();
        let uploader = AttachmentUploader::new(
            Arc::new(crm.clone()),
            Arc::new(InMemoryFileFetcher::new()),
            std::env::temp_dir(),
        );

        uploader.link(VEHICLES_MODULE, "V-1", &form_url()).await.unwrap();

        assert_eq!(
            crm.attachments(VEHICLES_MODULE)[0].source,
            AttachmentSource::Url(form_url().to_string())
        );
    }
}
