// Tests for corpus acquisition

use dirgraph_core::config::CorpusConfig;
use dirgraph_core::corpus::CorpusStore;
use dirgraph_core::event::{EventSink, JobEvent};
use dirgraph_core::job::JobError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a gzipped tarball shaped like the upstream corpus archive.
fn corpus_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in files {
        let full = format!("SecLists-test/{}", path);
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, full, content.as_bytes())
            .unwrap();
    }
    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap()
}

fn store_for(server_uri: &str, root: &TempDir) -> CorpusStore {
    CorpusStore::new(CorpusConfig {
        root: root.path().to_path_buf(),
        archive_url: format!("{}/corpus.tar.gz", server_uri),
        content_prefix: "Discovery/Web-Content".to_string(),
    })
}

#[tokio::test]
async fn test_cold_start_downloads_and_extracts() {
    let mock_server = MockServer::start().await;
    let archive = corpus_archive(&[
        ("Discovery/Web-Content/directory-list-small.txt", "admin\nlogin\n"),
        ("Discovery/Web-Content/CMS/wordpress.txt", "wp-admin\n"),
        ("Discovery/DNS/subdomains.txt", "mail\nwww\n"),
        ("Discovery/Web-Content/README.md", "docs"),
    ]);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let store = store_for(&mock_server.uri(), &root);
    let sink = Arc::new(EventSink::new());

    let handle = store.ensure(&sink).await.unwrap();

    // only .txt files below the content prefix land on disk
    assert!(handle.root.join("directory-list-small.txt").exists());
    assert!(handle.root.join("CMS").join("wordpress.txt").exists());
    assert!(!handle.root.join("README.md").exists());
    assert!(!handle.root.join("subdomains.txt").exists());

    // download progress was observable
    let saw_bytes = sink.history().iter().any(|e| {
        matches!(
            e,
            JobEvent::Stage {
                bytes_downloaded: Some(_),
                ..
            }
        )
    });
    assert!(saw_bytes);

    let index = store.index().unwrap();
    assert_eq!(index.len(), 2);
}

#[tokio::test]
async fn test_warm_start_skips_download() {
    let root = TempDir::new().unwrap();
    let lists = root.path().join("web-content");
    fs::create_dir_all(&lists).unwrap();
    fs::write(lists.join("common.txt"), "admin\n").unwrap();

    // nothing listens on this URL; a warm start must never need it
    let store = CorpusStore::new(CorpusConfig {
        root: root.path().to_path_buf(),
        archive_url: "http://127.0.0.1:1/corpus.tar.gz".to_string(),
        content_prefix: "Discovery/Web-Content".to_string(),
    });
    let sink = Arc::new(EventSink::new());

    let handle = store.ensure(&sink).await.unwrap();
    assert!(handle.root.join("common.txt").exists());
}

#[tokio::test]
async fn test_concurrent_ensure_downloads_once() {
    let mock_server = MockServer::start().await;
    let archive = corpus_archive(&[("Discovery/Web-Content/common.txt", "admin\n")]);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let store = Arc::new(store_for(&mock_server.uri(), &root));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let sink = Arc::new(EventSink::new());
        handles.push(tokio::spawn(async move { store.ensure(&sink).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    // the .expect(1) on the mock verifies the single download on drop
}

#[tokio::test]
async fn test_empty_archive_is_fatal() {
    let mock_server = MockServer::start().await;
    let archive = corpus_archive(&[("Discovery/DNS/subdomains.txt", "www\n")]);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let store = store_for(&mock_server.uri(), &root);
    let sink = Arc::new(EventSink::new());

    let result = store.ensure(&sink).await;
    assert!(matches!(result, Err(JobError::CorpusUnavailable(_))));
}

#[tokio::test]
async fn test_corrupt_archive_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"this is not a tarball".to_vec()))
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let store = store_for(&mock_server.uri(), &root);
    let sink = Arc::new(EventSink::new());

    let result = store.ensure(&sink).await;
    assert!(matches!(result, Err(JobError::CorpusUnavailable(_))));
}

#[tokio::test]
async fn test_http_failure_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let store = store_for(&mock_server.uri(), &root);
    let sink = Arc::new(EventSink::new());

    let result = store.ensure(&sink).await;
    assert!(matches!(result, Err(JobError::CorpusUnavailable(_))));
}

#[test]
fn test_gz_roundtrip_helper() {
    // keep the archive helper honest
    let archive = corpus_archive(&[("Discovery/Web-Content/a.txt", "x\n")]);
    let mut decoder = flate2::read::GzDecoder::new(archive.as_slice());
    let mut out = Vec::new();
    std::io::Read::read_to_end(&mut decoder, &mut out).unwrap();
    assert!(!out.is_empty());
}
