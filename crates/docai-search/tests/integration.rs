use std::path::{Path, PathBuf};
use std::sync::Arc;

use docai_core::{Cache, DocaiError, FileCache, OfflineProvider, Provider};
use docai_search::{search_documents, IndexBuilder, SearchIndex};

fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn offline() -> Arc<dyn Provider> {
    Arc::new(OfflineProvider::default())
}

#[tokio::test]
async fn build_save_and_query_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs).unwrap();

    let setup = write_doc(
        &docs,
        "setup.md",
        "# Setup\n\nInstall the theme with pip. Then enable the search plugin.\n\n```yaml\nplugins:\n  - search\n```\n",
    );
    let deploy = write_doc(
        &docs,
        "deploy.md",
        "# Deploy\n\nPublish the site to GitHub Pages. Use a custom domain if needed.",
    );

    let index_path = dir.path().join(".ai-cache/search_index.json");
    let cache: Arc<dyn Cache> = Arc::new(FileCache::new(dir.path().join(".ai-cache/cache")));
    let builder = IndexBuilder::new(offline(), Some(cache.clone()), &index_path);

    let index = builder
        .build_index_from_files(&[setup, deploy])
        .await
        .unwrap();
    index.save().unwrap();
    assert!(index_path.exists());

    let stats = SearchIndex::open(&index_path).unwrap().get_stats().unwrap();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.total_chunks, 2);
    assert!(stats.index_size_mb > 0.0);

    // Fallback embeddings are exact-text hashes, so querying with a chunk's
    // own text ranks it first.
    let query = index.chunks()[1].text.clone();
    let results = search_documents(&query, &index_path, offline(), Some(cache), 5)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, query);
    assert_eq!(results[0].metadata["filename"], "deploy.md");
    assert!(results[0].score >= results[1].score);
    assert!(results[0].highlight.contains("Deploy"));
    assert!(results.iter().all(|r| !r.text.contains("plugins:")));
}

#[tokio::test]
async fn update_index_appends_to_saved_index() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index.json");
    let first = write_doc(dir.path(), "a.md", "Alpha page.");
    let second = write_doc(dir.path(), "b.md", "Beta page. With two sentences.");

    let builder = IndexBuilder::new(offline(), None, &index_path);
    builder
        .build_index_from_files(&[first])
        .await
        .unwrap()
        .save()
        .unwrap();

    let mut index = SearchIndex::open(&index_path).unwrap();
    builder.update_index(&mut index, &[second]).await.unwrap();
    index.save().unwrap();

    let reloaded = SearchIndex::open(&index_path).unwrap();
    assert_eq!(reloaded.metadata().total_documents, 2);
    assert_eq!(reloaded.len(), 2);
    let ids: Vec<Option<usize>> = reloaded.chunks().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![Some(0), Some(1)]);
}

#[tokio::test]
async fn querying_without_an_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = search_documents("anything", &dir.path().join("none.json"), offline(), None, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, DocaiError::IndexNotFound(_)));
    assert!(err.to_string().contains("build it first"));
}

#[tokio::test]
async fn corrupted_index_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index.json");
    std::fs::write(&index_path, "not json").unwrap();

    let err = search_documents("query", &index_path, offline(), None, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, DocaiError::IndexCorrupted { .. }));
}
