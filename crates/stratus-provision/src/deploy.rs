//! Leaf content-deployment helpers
//!
//! These push site content to resources the orchestrator already created.
//! They sit outside the transaction log: a failed upload does not trigger
//! rollback, it is reported to the caller through the returned report.

use crate::error::DeployError;
use crate::rollback::BatchReport;
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use futures_util::stream;
use std::io::Read;
use stratus_cloud::SiteHost;
use tar::Archive;

/// Default fan-out width for blob uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 8;

// Pre-allocation cap per entry; the declared header size is untrusted input,
// so anything beyond this grows through read_to_end instead.
const ENTRY_PREALLOC_CAP: u64 = 1 << 20;

/// One file extracted from a site archive.
#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Unpack an in-memory `.tar.gz` site archive and upload every file into a
/// blob container with bounded concurrency.
///
/// Every per-file outcome lands in the report; a failed upload never drops
/// the remaining files.
pub async fn upload_site_archive(
    host: &dyn SiteHost,
    container: &str,
    archive: &[u8],
    max_concurrency: usize,
) -> Result<BatchReport, DeployError> {
    let entries = unpack_archive(archive)?;
    tracing::info!(
        "Uploading {} file(s) to container '{}'",
        entries.len(),
        container
    );

    let outcomes: Vec<(String, stratus_cloud::Result<()>)> =
        stream::iter(entries.into_iter().map(|entry| async move {
            tracing::debug!("Uploading {} ({})", entry.name, entry.content_type);
            let outcome = host
                .upload_blob(container, &entry.name, &entry.content_type, entry.bytes)
                .await;
            (entry.name, outcome)
        }))
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    let mut report = BatchReport::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(()) => report.add_success(name),
            Err(error) => {
                tracing::warn!("Upload failed for {}: {}", name, error);
                report.add_failure(name, error.to_string());
            }
        }
    }
    Ok(report)
}

/// Enable static-website serving with the conventional documents.
pub async fn enable_static_site(
    host: &dyn SiteHost,
    index_document: &str,
    error_document: &str,
) -> Result<(), DeployError> {
    tracing::info!(
        "Enabling static website (index: {}, 404: {})",
        index_document,
        error_document
    );
    host.set_static_website(index_document, error_document)
        .await?;
    Ok(())
}

/// Push a zip archive to an app's deployment endpoint.
pub async fn zip_deploy_app(
    host: &dyn SiteHost,
    app_name: &str,
    bytes: Vec<u8>,
) -> Result<(), DeployError> {
    tracing::info!("Zip-deploying {} byte(s) to app '{}'", bytes.len(), app_name);
    host.zip_deploy(app_name, bytes).await?;
    Ok(())
}

fn unpack_archive(archive: &[u8]) -> Result<Vec<ArchiveEntry>, DeployError> {
    let mut tar = Archive::new(GzDecoder::new(archive));
    let mut entries = Vec::new();

    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();

        let mut bytes = Vec::with_capacity(entry.size().min(ENTRY_PREALLOC_CAP) as usize);
        entry.read_to_end(&mut bytes)?;
        entries.push(ArchiveEntry {
            name,
            content_type,
            bytes,
        });
    }
    Ok(entries)
}
