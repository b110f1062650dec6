use recital_core::db::open_db_in_memory;
use recital_core::{
    AnnotationService, IngestService, IngestServiceError, PoemDocument, PoemRepository,
    PoemSettings, PoemSources, SqlitePoemRepository, NEW_ANNOTATION_IDENTIFIER,
};
use rusqlite::Connection;
use serde_json::json;

fn annotated_conn() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut sources = PoemSources::new();
        sources.insert(
            "Tide".to_string(),
            "Tide\n\nthe sea, the sea\nreturns\n\nAnon".to_string(),
        );
        let settings = PoemSettings {
            order: vec!["Tide".to_string()],
            centered: vec!["Tide".to_string()],
        };
        let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
        IngestService::new(repo).ingest(&sources, &settings).unwrap();
    }
    {
        let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
        let mut service = AnnotationService::new(repo);
        service
            .edit_quote(
                "Tide",
                NEW_ANNOTATION_IDENTIFIER,
                vec!["{2}the{2}".into(), "{2}sea{2}".into()],
            )
            .unwrap();
        service
            .edit_note(
                "Tide",
                NEW_ANNOTATION_IDENTIFIER,
                "repetition",
                vec!["{2}sea{2}".into(), "{1}sea{1}".into()],
            )
            .unwrap();
    }
    conn
}

#[test]
fn exported_document_matches_rendering_contract() {
    let mut conn = annotated_conn();
    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    let document = serde_json::to_value(repo.export_document().unwrap()).unwrap();

    assert_eq!(
        document,
        json!({
            "Tide": {
                "convertedPoem": "{1}the{1} {1}sea{1}|{1},{1} {2}the{2} {2}sea{2}\n{1}returns{1}",
                "wordCount": 5,
                "author": "Anon",
                "quotes": [["{2}the{2}", "{2}sea{2}"]],
                "notes": {"repetition": ["{1}sea{1}", "{2}sea{2}"]},
                "centered": true
            }
        })
    );
}

#[test]
fn restoring_an_export_reproduces_it() {
    let mut source = annotated_conn();
    let exported = {
        let repo = SqlitePoemRepository::try_new(&mut source).unwrap();
        serde_json::to_string(&repo.export_document().unwrap()).unwrap()
    };

    let mut target = open_db_in_memory().unwrap();
    let document: PoemDocument = serde_json::from_str(&exported).unwrap();
    {
        let repo = SqlitePoemRepository::try_new(&mut target).unwrap();
        assert_eq!(IngestService::new(repo).restore_document(document).unwrap(), 1);
    }

    let repo = SqlitePoemRepository::try_new(&mut target).unwrap();
    assert_eq!(
        serde_json::to_string(&repo.export_document().unwrap()).unwrap(),
        exported
    );
}

#[test]
fn restoring_malformed_text_is_rejected() {
    let document: PoemDocument = serde_json::from_value(json!({
        "Broken": {"convertedPoem": "{1}open", "wordCount": 1, "author": "Anon"}
    }))
    .unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let repo = SqlitePoemRepository::try_new(&mut conn).unwrap();
    let err = IngestService::new(repo).restore_document(document).unwrap_err();
    match err {
        IngestServiceError::Document { title, .. } => assert_eq!(title, "Broken"),
        other => panic!("unexpected error: {other}"),
    }
}
