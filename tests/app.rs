use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_genome_fetch::app::{App, ProgressEvent, ProgressSink, RowOutcome};
use kira_genome_fetch::config::RunConfig;
use kira_genome_fetch::error::KiraError;
use kira_genome_fetch::fetcher::Sleeper;
use kira_genome_fetch::transfer::Transferrer;

#[derive(Default)]
struct MockTransfer {
    fail: bool,
    urls: Mutex<Vec<String>>,
}

impl MockTransfer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

impl Transferrer for MockTransfer {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(KiraError::TransferStatus {
                status: "exit status: 3".to_string(),
                message: "resource not found".to_string(),
            });
        }
        let name = url.rsplit('/').next().unwrap();
        fs::write(dest_dir.join(name), b">seq\nACGT\n").unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct NoSleep {
    delays: Mutex<Vec<Duration>>,
}

impl Sleeper for NoSleep {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

#[derive(Default)]
struct CollectSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for CollectSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn setup(manifest: &str) -> (tempfile::TempDir, RunConfig) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let manifest_path = root.join("genomes.tsv");
    fs::write(manifest_path.as_std_path(), manifest).unwrap();
    let config = RunConfig::new(manifest_path, root.join("run"));
    (temp, config)
}

#[test]
fn blank_rows_are_skipped_not_failed() {
    let (_temp, config) = setup("accession\tassembly\nGCF_000001405\tGRCh38\n\torphan\n");
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());
    let sink = CollectSink::default();

    let summary = app.run(&sink).unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(app.fetcher().transferrer().calls(), 1);
    assert!(
        app.store()
            .download_path("GCF_000001405_GRCh38_genomic.fna.gz")
            .as_std_path()
            .is_file()
    );
    assert_eq!(sink.messages.lock().unwrap().len(), 2);
}

#[test]
fn transfer_receives_sharded_archive_url() {
    let (_temp, config) = setup("acc\tasm\nGCF_000001405\tGRCh38\n");
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());

    app.run(&CollectSink::default()).unwrap();

    assert_eq!(
        app.fetcher().transferrer().urls.lock().unwrap()[0],
        "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/000/001/405/GCF_000001405_GRCh38/GCF_000001405_GRCh38_genomic.fna.gz"
    );
}

#[test]
fn malformed_accession_fails_row_and_run_continues() {
    let (_temp, config) = setup("acc\tasm\nGCF_12\tshort\nGCA_000005845.2\tASM584v2\n");
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());

    let summary = app.run(&CollectSink::default()).unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failed, 1);
    assert_matches!(
        &summary.rows[0],
        RowOutcome::Failed { line: 2, accession: Some(acc), .. } if acc == "GCF_12"
    );
    assert_eq!(app.fetcher().transferrer().calls(), 1);
}

#[test]
fn exhausted_retries_count_as_failure() {
    let (_temp, config) = setup("acc\tasm\nGCF_000001405\tGRCh38\nGCF_000001635\tGRCm39\n");
    let app = App::with_sleeper(config, MockTransfer::failing(), NoSleep::default());

    let summary = app.run(&CollectSink::default()).unwrap();

    assert_eq!(summary.success, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(app.fetcher().transferrer().calls(), 6);
    assert_eq!(
        *app.fetcher().sleeper().delays.lock().unwrap(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(1),
            Duration::from_secs(2),
        ]
    );
}

#[test]
fn existing_download_is_reused() {
    let (_temp, config) = setup("acc\tasm\nGCF_000001405\tGRCh38\n");
    let app = App::with_sleeper(config, MockTransfer::failing(), NoSleep::default());
    app.store().ensure_layout().unwrap();
    fs::write(
        app.store()
            .download_path("GCF_000001405_GRCh38_genomic.fna.gz")
            .as_std_path(),
        b">seq\n",
    )
    .unwrap();

    let summary = app.run(&CollectSink::default()).unwrap();

    assert_eq!(summary.success, 1);
    assert_matches!(&summary.rows[0], RowOutcome::Success { action, .. } if action == "existing");
    assert_eq!(app.fetcher().transferrer().calls(), 0);
}

#[test]
fn missing_manifest_stops_before_downloads() {
    let (temp, mut config) = setup("");
    config.manifest = Utf8PathBuf::from_path_buf(temp.path().join("absent.tsv")).unwrap();
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());

    let err = app.run(&CollectSink::default()).unwrap_err();

    assert_matches!(err, KiraError::ManifestMissing(_));
    assert_eq!(app.fetcher().transferrer().calls(), 0);
    let out = app.store().download_dir();
    assert!(out.as_std_path().is_dir());
    assert_eq!(fs::read_dir(out.as_std_path()).unwrap().count(), 0);
}

#[test]
fn dry_run_touches_nothing() {
    let (_temp, mut config) = setup("acc\tasm\nGCF_000001405\tGRCh38\n");
    config.dry_run = true;
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());

    let summary = app.run(&CollectSink::default()).unwrap();

    assert_eq!(summary.success, 1);
    assert_matches!(&summary.rows[0], RowOutcome::Success { action, .. } if action == "dry-run");
    assert_eq!(app.fetcher().transferrer().calls(), 0);
    assert!(!app.store().out_root().as_std_path().exists());
}

#[test]
fn summary_serializes_row_status() {
    let (_temp, config) = setup("acc\tasm\n\t\nGCF_12\tx\n");
    let app = App::with_sleeper(config, MockTransfer::default(), NoSleep::default());

    let summary = app.run(&CollectSink::default()).unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["skipped"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["rows"][0]["status"], "skipped");
    assert_eq!(json["rows"][1]["status"], "failed");
}
