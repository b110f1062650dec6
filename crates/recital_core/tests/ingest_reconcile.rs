use recital_core::db::open_db_in_memory;
use recital_core::{
    AnnotationService, IngestError, IngestReport, IngestService, IngestServiceError,
    PoemRepository, SqlitePoemRepository, NEW_ANNOTATION_IDENTIFIER,
};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write_poem(dir: &Path, title: &str, body: &str) {
    std::fs::write(
        dir.join(format!("{title}.txt")),
        format!("{title}\n\n{body}\n\nAnon\n"),
    )
    .unwrap();
}

fn ingest(conn: &mut Connection, dir: &Path) -> Result<IngestReport, IngestServiceError> {
    let repo = SqlitePoemRepository::try_new(conn).unwrap();
    IngestService::new(repo).ingest_dir(dir)
}

fn words(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

#[test]
fn ingestion_follows_settings_order_and_centering() {
    let dir = TempDir::new().unwrap();
    write_poem(dir.path(), "Alpha", "first poem");
    write_poem(dir.path(), "Beta", "second poem, here");
    write_poem(dir.path(), "Gamma", "third");
    std::fs::write(
        dir.path().join("poemSettings.json"),
        r#"{"order": ["Beta", "Alpha"], "centered": ["Alpha"]}"#,
    )
    .unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let report = ingest(&mut conn, dir.path()).unwrap();

    let titles: Vec<&str> = report.poems.iter().map(|poem| poem.title.as_str()).collect();
    assert_eq!(titles, vec!["Beta", "Alpha", "Gamma"]);
    assert!(report.poems.iter().all(|poem| poem.is_new));
    assert_eq!(report.poems[0].word_count, 3);

    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    let document = serde_json::to_value(repo.export_document().unwrap()).unwrap();
    assert_eq!(document["Alpha"]["centered"], json!(true));
    assert_eq!(document["Beta"]["centered"], json!(false));
    assert_eq!(
        document["Beta"]["convertedPoem"],
        json!("{1}second{1} {1}poem{1}|{1},{1} {1}here{1}")
    );
    assert_eq!(document["Gamma"]["author"], json!("Anon"));
    assert_eq!(document["Gamma"]["notes"], json!({}));
    assert_eq!(document["Gamma"]["quotes"], json!([]));
}

#[test]
fn reingestion_demotes_annotations_whose_words_vanished() {
    let dir = TempDir::new().unwrap();
    write_poem(dir.path(), "Echo", "w1 w2 w3 w2");
    let mut conn = open_db_in_memory().unwrap();
    ingest(&mut conn, dir.path()).unwrap();

    {
        let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
        let mut service = AnnotationService::new(repo);
        service
            .edit_quote("Echo", NEW_ANNOTATION_IDENTIFIER, words(&["{1}w2{1}", "{1}w3{1}"]))
            .unwrap();
        service
            .edit_note("Echo", NEW_ANNOTATION_IDENTIFIER, "echo", words(&["{2}w2{2}"]))
            .unwrap();
        service
            .edit_note("Echo", NEW_ANNOTATION_IDENTIFIER, "start", words(&["{1}w1{1}"]))
            .unwrap();
    }

    write_poem(dir.path(), "Echo", "w1 w2 w2");
    let report = ingest(&mut conn, dir.path()).unwrap();
    let summary = &report.poems[0];
    assert!(!summary.is_new);
    assert_eq!(summary.demoted_quotes, 1);
    assert_eq!(summary.demoted_notes, 0);
    assert_eq!(summary.carried_notes, 2);

    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    let record = repo.get_poem("Echo").unwrap().unwrap();
    assert!(record.quotes.is_empty());
    let labels: Vec<&str> = record.notes.iter().map(|note| note.label.as_str()).collect();
    assert_eq!(labels, vec!["start", "echo"]);

    let log = serde_json::to_value(repo.load_invalid_log().unwrap()).unwrap();
    assert_eq!(
        log["quotes"]["word-no-longer-exists"],
        json!([["{1}w2{1}", "{1}w3{1}"]])
    );
    let entries = repo.list_invalid_entries(Some(report.run_id)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].poem_title, "Echo");
}

#[test]
fn invalid_log_is_additive_across_runs() {
    let dir = TempDir::new().unwrap();
    write_poem(dir.path(), "Echo", "a b c");
    let mut conn = open_db_in_memory().unwrap();
    ingest(&mut conn, dir.path()).unwrap();

    let mut runs = Vec::new();
    for (quote, next_body) in [("{1}a{1}", "b c"), ("{1}b{1}", "c")] {
        {
            let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
            AnnotationService::new(repo)
                .edit_quote("Echo", NEW_ANNOTATION_IDENTIFIER, words(&[quote]))
                .unwrap();
        }
        write_poem(dir.path(), "Echo", next_body);
        runs.push(ingest(&mut conn, dir.path()).unwrap().run_id);
    }

    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    let log = repo.load_invalid_log().unwrap();
    assert_eq!(log.quotes.word_no_longer_exists.len(), 2);
    assert_ne!(runs[0], runs[1]);
    assert_eq!(repo.list_invalid_entries(Some(runs[1])).unwrap().len(), 1);
    assert_eq!(repo.list_invalid_entries(None).unwrap().len(), 2);
}

#[test]
fn title_mismatch_aborts_the_whole_run() {
    let dir = TempDir::new().unwrap();
    write_poem(dir.path(), "Echo", "a b");
    let mut conn = open_db_in_memory().unwrap();
    ingest(&mut conn, dir.path()).unwrap();

    write_poem(dir.path(), "Echo", "a b c");
    std::fs::write(dir.path().join("Zephyr.txt"), "Wrong\n\nbody\n\nAnon").unwrap();

    let err = ingest(&mut conn, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        IngestServiceError::Ingest(IngestError::TitleMismatch { .. })
    ));

    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    assert_eq!(repo.list_titles().unwrap(), vec!["Echo"]);
    let record = repo.get_poem("Echo").unwrap().unwrap();
    assert_eq!(record.poem.word_count, 2);
}

#[test]
fn poems_without_a_source_are_removed() {
    let dir = TempDir::new().unwrap();
    write_poem(dir.path(), "Echo", "a");
    write_poem(dir.path(), "Fade", "b");
    let mut conn = open_db_in_memory().unwrap();
    ingest(&mut conn, dir.path()).unwrap();

    std::fs::remove_file(dir.path().join("Fade.txt")).unwrap();
    let report = ingest(&mut conn, dir.path()).unwrap();
    assert_eq!(report.removed, vec!["Fade"]);

    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    assert_eq!(repo.list_titles().unwrap(), vec!["Echo"]);
}
