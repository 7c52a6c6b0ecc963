use crate::config::{RunConfig, APP_NAME};
use crate::domain::extract::extract;
use crate::domain::metadata::{ResolutionMap, ResolvedMetadata};
use crate::domain::outcome::ItemOutcome;
use crate::domain::reference::{VideoReference, WorkSet};
use crate::ports::fetch::VideoFetcher;
use crate::ports::lookup::MetadataLookup;
use crate::ports::storage::StoragePort;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

/// Batch coordinator: extract -> resolve -> download/upload/cleanup -> report.
///
/// Stages run under a strict barrier: the resolve stage fully drains before
/// the first download starts. Within a stage, in-flight operations are
/// bounded by a semaphore; completion order is first-to-finish. Individual
/// failures degrade the item, never the batch.
pub struct Pipeline<L, F, S> {
    lookup: Arc<L>,
    fetcher: Arc<F>,
    storage: Arc<S>,
    config: Arc<RunConfig>,
}

/// End-of-run reconciliation: which references never resolved, and the
/// terminal outcome of every reference that did.
#[derive(Debug)]
pub struct RunReport {
    /// Total references extracted from the inputs (duplicates included)
    pub references: usize,
    /// References that produced no metadata during the resolve stage
    pub unresolved: Vec<VideoReference>,
    /// Terminal outcome per unique resolved reference
    pub outcomes: Vec<(VideoReference, ItemOutcome)>,
}

impl RunReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_uploaded())
            .count()
    }

    pub fn download_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == ItemOutcome::DownloadFailed)
            .count()
    }

    pub fn upload_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == ItemOutcome::UploadFailed)
            .count()
    }
}

impl<L, F, S> Pipeline<L, F, S>
where
    L: MetadataLookup + 'static,
    F: VideoFetcher + 'static,
    S: StoragePort + 'static,
{
    pub fn new(lookup: L, fetcher: F, storage: S, config: RunConfig) -> Self {
        Self {
            lookup: Arc::new(lookup),
            fetcher: Arc::new(fetcher),
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }

    pub async fn run(&self, inputs: &[String]) -> RunReport {
        let work = self.find_videos(inputs);

        let resolution = self.resolve_all(&work).await;
        let unresolved = work.missing_from(&resolution);
        if !resolution.is_empty() {
            println!("[{}] got videos info!", APP_NAME);
            if !unresolved.is_empty() {
                println!("[{}] unable to download these videos", APP_NAME);
                for reference in &unresolved {
                    println!("{}", reference);
                }
            }
        }

        let outcomes = self.process_all(resolution).await;

        let report = RunReport {
            references: work.len(),
            unresolved,
            outcomes,
        };
        println!(
            "[{}] {} uploaded, {} download failure/s, {} upload failure/s",
            APP_NAME,
            report.uploaded(),
            report.download_failures(),
            report.upload_failures()
        );
        report
    }

    /// Stage 1: normalize every input item into the work set.
    fn find_videos(&self, inputs: &[String]) -> WorkSet {
        println!("[{}] finding videos!", APP_NAME);
        let mut work = WorkSet::new();
        for item in inputs {
            work.extend(extract(item, &self.config.input_key));
        }
        println!(
            "[{}] processing {} input/s having {} video/s",
            APP_NAME,
            inputs.len(),
            work.len()
        );
        work
    }

    /// Stage 2: metadata lookup for every reference, at most
    /// `info_concurrency` in flight. Failed lookups leave no entry.
    async fn resolve_all(&self, work: &WorkSet) -> ResolutionMap {
        let resolution = Arc::new(Mutex::new(ResolutionMap::new()));
        let semaphore = Arc::new(Semaphore::new(self.config.info_concurrency));

        let mut handles = Vec::with_capacity(work.len());
        for reference in work.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let lookup = Arc::clone(&self.lookup);
            let resolution = Arc::clone(&resolution);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                match lookup.lookup(&reference).await {
                    Ok(metadata) => {
                        println!(
                            "[{}] get_info {} {}",
                            APP_NAME, metadata.filename, reference
                        );
                        resolution.lock().await.insert(reference, metadata);
                    }
                    Err(e) => {
                        eprintln!("[{}] get_info {} failed: {}", APP_NAME, reference, e);
                    }
                }
            }));
        }
        // stage barrier: every lookup completes before downloads start
        futures::future::join_all(handles).await;

        match Arc::try_unwrap(resolution) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }

    /// Stage 3: per resolved reference, one download->upload->cleanup chain
    /// holding a single permit, so downloads and uploads together never
    /// exceed `download_concurrency`.
    async fn process_all(&self, resolution: ResolutionMap) -> Vec<(VideoReference, ItemOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.config.download_concurrency));

        let mut handles = Vec::with_capacity(resolution.len());
        for (reference, metadata) in resolution {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let storage = Arc::clone(&self.storage);
            let config = Arc::clone(&self.config);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let outcome = process_item(fetcher, storage, config, &reference, metadata).await;
                (reference, outcome)
            }));
        }

        let outcomes: Vec<(VideoReference, ItemOutcome)> = futures::future::join_all(handles)
            .await
            .into_iter()
            .flatten()
            .collect();
        if !outcomes.is_empty() {
            println!("[{}] Downloaded videos and uploaded them to S3!", APP_NAME);
        }
        outcomes
    }
}

/// The fused per-item chain. Each step that fails returns the matching
/// outcome variant; later steps become visible no-ops instead of running
/// with an absent artifact.
async fn process_item<F, S>(
    fetcher: Arc<F>,
    storage: Arc<S>,
    config: Arc<RunConfig>,
    reference: &VideoReference,
    metadata: ResolvedMetadata,
) -> ItemOutcome
where
    F: VideoFetcher,
    S: StoragePort,
{
    println!("[{}] downloading {}", APP_NAME, reference);
    if let Err(e) = fetcher.fetch(reference).await {
        eprintln!("[{}] download failed {}: {}", APP_NAME, reference, e);
        return ItemOutcome::DownloadFailed;
    }

    let filename = metadata.filename;
    if filename.is_empty() {
        // lookup never produced a usable filename; nothing to upload
        return ItemOutcome::Resolved;
    }
    println!("[{}] downloaded {} to {}", APP_NAME, reference, filename);

    let key = object_key(&config.upload_dir, &filename);
    println!(
        "[{}] uploading to https://s3.amazonaws.com/{}/{}",
        APP_NAME, config.upload_bucket, key
    );
    if let Err(e) = storage.put(Path::new(&filename), &key).await {
        eprintln!("[{}] error uploading {}: {}", APP_NAME, filename, e);
        // failed uploads keep their local file, even with delete-downloads set
        return ItemOutcome::UploadFailed;
    }
    println!(
        "[{}] uploaded https://s3.amazonaws.com/{}/{}",
        APP_NAME, config.upload_bucket, key
    );

    let removed = remove_download(&filename, config.delete_downloads).await;
    ItemOutcome::Succeeded { removed }
}

fn object_key(upload_dir: &str, filename: &str) -> String {
    if upload_dir.is_empty() {
        filename.to_owned()
    } else {
        format!("{}/{}", upload_dir, filename)
    }
}

/// Best-effort local deletion; errors are logged and swallowed.
async fn remove_download(filename: &str, enabled: bool) -> bool {
    if !enabled {
        return false;
    }
    if tokio::fs::metadata(filename).await.is_err() {
        return false;
    }
    match tokio::fs::remove_file(filename).await {
        Ok(()) => {
            println!("[{}] removed {}", APP_NAME, filename);
            true
        }
        Err(e) => {
            eprintln!("[{}] could not remove {}: {}", APP_NAME, filename, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::fetch::MockVideoFetcher;
    use crate::ports::lookup::MockMetadataLookup;
    use crate::ports::storage::MockStoragePort;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn test_config(delete_downloads: bool) -> RunConfig {
        RunConfig {
            config_file: ".vidlift".to_owned(),
            download_dir: ".".to_owned(),
            delete_downloads,
            upload_acl: "public-read".to_owned(),
            upload_bucket: "fnlv".to_owned(),
            upload_dir: "videos".to_owned(),
            upload_region: "us-east-1".to_owned(),
            upload_storage_class: "REDUCED_REDUNDANCY".to_owned(),
            input_key: "videos".to_owned(),
            info_concurrency: 10,
            download_concurrency: 2,
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
        }
    }

    fn metadata_for(reference: &VideoReference, filename: &str) -> ResolvedMetadata {
        ResolvedMetadata {
            reference: reference.clone(),
            filename: filename.to_owned(),
            filesize: 1000,
        }
    }

    #[test]
    fn object_key_joins_upload_dir_and_filename() {
        assert_eq!(object_key("videos", "video.mp4"), "videos/video.mp4");
        assert_eq!(object_key("", "video.mp4"), "video.mp4");
    }

    #[tokio::test]
    async fn unresolved_references_appear_in_the_diff() {
        let mut lookup = MockMetadataLookup::new();
        lookup.expect_lookup().returning(|reference| {
            if reference.as_str() == "good" {
                Ok(metadata_for(reference, ""))
            } else {
                Err("no metadata".into())
            }
        });
        let mut fetcher = MockVideoFetcher::new();
        fetcher.expect_fetch().returning(|_| Ok(()));
        let storage = MockStoragePort::new();

        let pipeline = Pipeline::new(lookup, fetcher, storage, test_config(false));
        let report = pipeline
            .run(&["good".to_owned(), "bad".to_owned()])
            .await;

        assert_eq!(report.references, 2);
        assert_eq!(report.unresolved, vec![VideoReference::from("bad")]);
        assert_eq!(report.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn successful_chain_uploads_then_removes_the_local_file() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("video.mp4");
        let filename = local.to_str().unwrap().to_owned();

        let mut lookup = MockMetadataLookup::new();
        let lookup_filename = filename.clone();
        lookup
            .expect_lookup()
            .returning(move |reference| Ok(metadata_for(reference, &lookup_filename)));

        let mut fetcher = MockVideoFetcher::new();
        let fetched = local.clone();
        fetcher.expect_fetch().times(1).returning(move |_| {
            std::fs::write(&fetched, b"bytes").unwrap();
            Ok(())
        });

        let mut storage = MockStoragePort::new();
        let expected_path = local.clone();
        storage
            .expect_put()
            .withf(move |path, key| path == expected_path && key.starts_with("videos/"))
            .times(1)
            .returning(|_, _| Ok(()));

        let pipeline = Pipeline::new(lookup, fetcher, storage, test_config(true));
        let report = pipeline.run(&["abc123".to_owned()]).await;

        assert_eq!(report.uploaded(), 1);
        assert_eq!(
            report.outcomes[0].1,
            ItemOutcome::Succeeded { removed: true }
        );
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn download_failure_degrades_to_inert_passthrough() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("stale.mp4");
        std::fs::write(&local, b"old").unwrap();
        let filename = local.to_str().unwrap().to_owned();

        let mut lookup = MockMetadataLookup::new();
        lookup
            .expect_lookup()
            .returning(move |reference| Ok(metadata_for(reference, &filename)));

        let mut fetcher = MockVideoFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Err("exit status 1".into()));

        let mut storage = MockStoragePort::new();
        storage.expect_put().never();

        let pipeline = Pipeline::new(lookup, fetcher, storage, test_config(true));
        let report = pipeline.run(&["abc123".to_owned()]).await;

        assert_eq!(report.outcomes[0].1, ItemOutcome::DownloadFailed);
        // cleanup never ran either
        assert!(local.exists());
    }

    #[tokio::test]
    async fn upload_failure_skips_cleanup() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("video.mp4");
        let filename = local.to_str().unwrap().to_owned();

        let mut lookup = MockMetadataLookup::new();
        lookup
            .expect_lookup()
            .returning(move |reference| Ok(metadata_for(reference, &filename)));

        let mut fetcher = MockVideoFetcher::new();
        let fetched = local.clone();
        fetcher.expect_fetch().returning(move |_| {
            std::fs::write(&fetched, b"bytes").unwrap();
            Ok(())
        });

        let mut storage = MockStoragePort::new();
        storage
            .expect_put()
            .times(1)
            .returning(|_, _| Err("access denied".into()));

        let pipeline = Pipeline::new(lookup, fetcher, storage, test_config(true));
        let report = pipeline.run(&["abc123".to_owned()]).await;

        assert_eq!(report.outcomes[0].1, ItemOutcome::UploadFailed);
        // delete-downloads is set, but the failure branch never forwards
        // to cleanup, so the local file survives
        assert!(local.exists());
    }

    #[tokio::test]
    async fn duplicate_references_resolve_twice_but_process_once() {
        let mut lookup = MockMetadataLookup::new();
        lookup
            .expect_lookup()
            .times(2)
            .returning(|reference| Ok(metadata_for(reference, "")));
        let mut fetcher = MockVideoFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_| Ok(()));
        let storage = MockStoragePort::new();

        let pipeline = Pipeline::new(lookup, fetcher, storage, test_config(false));
        let report = pipeline.run(&[r#"["dup","dup"]"#.to_owned()]).await;

        assert_eq!(report.references, 2);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].1, ItemOutcome::Resolved);
    }

    /// Hand-rolled double that records the in-flight high-water mark.
    struct CountingLookup {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MetadataLookup for CountingLookup {
        async fn lookup(
            &self,
            reference: &VideoReference,
        ) -> Result<ResolvedMetadata, Box<dyn std::error::Error + Send + Sync>> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(metadata_for(reference, ""))
        }
    }

    /// Shared in-flight gauge for the download/upload doubles below.
    #[derive(Clone)]
    struct ChainGauge {
        current: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    impl ChainGauge {
        fn new() -> Self {
            Self {
                current: Arc::new(AtomicUsize::new(0)),
                max: Arc::new(AtomicUsize::new(0)),
            }
        }

        async fn track(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct CountingFetcher(ChainGauge);

    #[async_trait::async_trait]
    impl VideoFetcher for CountingFetcher {
        async fn fetch(
            &self,
            _reference: &VideoReference,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.track().await;
            Ok(())
        }
    }

    struct CountingStorage(ChainGauge);

    #[async_trait::async_trait]
    impl StoragePort for CountingStorage {
        async fn put(
            &self,
            _local_path: &std::path::Path,
            _key: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.track().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn process_stage_never_exceeds_download_concurrency() {
        let mut lookup = MockMetadataLookup::new();
        lookup
            .expect_lookup()
            .returning(|reference| Ok(metadata_for(reference, &format!("{}.mp4", reference))));

        // downloads and uploads share one budget, so a single gauge counts
        // both kinds of in-flight operation
        let gauge = ChainGauge::new();
        let fetcher = CountingFetcher(gauge.clone());
        let storage = CountingStorage(gauge.clone());

        let mut config = test_config(false);
        config.download_concurrency = 2;

        let inputs: Vec<String> = (0..10).map(|i| format!("ref{}", i)).collect();
        let pipeline = Pipeline::new(lookup, fetcher, storage, config);
        let report = pipeline.run(&inputs).await;

        assert_eq!(report.uploaded(), 10);
        assert!(gauge.max.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn resolve_stage_never_exceeds_info_concurrency() {
        let lookup = CountingLookup {
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
        };
        let mut fetcher = MockVideoFetcher::new();
        fetcher.expect_fetch().returning(|_| Ok(()));
        let storage = MockStoragePort::new();

        let mut config = test_config(false);
        config.info_concurrency = 3;

        let inputs: Vec<String> = (0..12).map(|i| format!("ref{}", i)).collect();
        let pipeline = Pipeline::new(lookup, fetcher, storage, config);
        let report = pipeline.run(&inputs).await;

        assert_eq!(report.outcomes.len(), 12);
        assert!(pipeline.lookup.max.load(Ordering::SeqCst) <= 3);
    }
}
