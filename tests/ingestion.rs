mod common;

use std::io::Write;

use chrono::NaiveDate;
use common::{StubEmbedder, TestDb, body_of, cube_row};
use reginsight_convergence::processing::cleaner::HtmlTextExtractor;
use reginsight_convergence::processing::ingest::{
    IngestError, IngestSettings, Ingestor, RowOutcome, SkipReason, ingest_csv,
};
use reginsight_convergence::repository::errors::RepositoryError;
use reginsight_convergence::repository::{DocumentReader, DocumentWriter};

#[test]
fn accepted_row_is_persisted_with_ten_day_bucket() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();

    let stats = Ingestor::new(&HtmlTextExtractor, &mut embedder, &repo, IngestSettings::default())
        .run(vec![Ok(cube_row("doc-1", "Canada", "01/05/2023", &body_of("capital", 600)))])
        .expect("ingestion should succeed");

    assert_eq!(stats.kept, 1);
    assert_eq!(stats.persisted, 1);
    let stored = repo.get_document("doc-1").expect("document should exist");
    assert_eq!(stored.time_bucket, "2023-01-01 to 2023-01-10");
    assert_eq!(
        stored.document.published_date,
        NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()
    );
    assert!(stored.document.clean_text.chars().count() >= 500);
    assert!(!stored.document.clean_text.contains("<p>"));
    assert_eq!(stored.embedding.map(|e| e.len()), Some(26));
}

#[test]
fn short_row_is_neither_embedded_nor_persisted() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();
    let mut ingestor =
        Ingestor::new(&HtmlTextExtractor, &mut embedder, &repo, IngestSettings::default());

    let outcome = ingestor
        .process_record(&cube_row("doc-short", "Canada", "01/05/2023", &"a".repeat(200)))
        .unwrap();
    let stats = ingestor.run(Vec::new()).unwrap();

    assert_eq!(outcome, RowOutcome::Skipped(SkipReason::TooShort));
    assert_eq!(stats.skipped_short, 1);
    assert_eq!(embedder.calls, 0);
    assert!(matches!(
        repo.get_document("doc-short"),
        Err(RepositoryError::NotFound)
    ));
    assert_eq!(repo.count_documents().unwrap(), 0);
}

#[test]
fn reingesting_a_document_overwrites_it() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();

    let mut first = cube_row("doc-1", "Canada", "01/05/2023", &body_of("alpha", 600));
    first.insert("CUBEIssuingDepartment".into(), "Supervision".into());
    let second = cube_row("doc-1", "Pakistan", "02/15/2023", &body_of("omega", 600));

    Ingestor::new(&HtmlTextExtractor, &mut embedder, &repo, IngestSettings::default())
        .run(vec![Ok(first)])
        .unwrap();
    Ingestor::new(&HtmlTextExtractor, &mut embedder, &repo, IngestSettings::default())
        .run(vec![Ok(second)])
        .unwrap();

    assert_eq!(repo.count_documents().unwrap(), 1);
    let stored = repo.get_document("doc-1").unwrap();
    assert_eq!(stored.document.jurisdiction, "Pakistan");
    assert_eq!(stored.time_bucket, "2023-02-10 to 2023-02-19");
    assert!(stored.document.clean_text.starts_with("omega"));
    assert_eq!(stored.document.department, None);
    assert_eq!(repo.list_jurisdictions().unwrap(), vec!["Pakistan".to_string()]);
}

#[test]
fn duplicate_rows_in_one_batch_keep_the_last() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();
    let rows = vec![
        Ok(cube_row("dup", "Canada", "01/05/2023", &body_of("first", 600))),
        Ok(cube_row("dup", "Canada", "01/05/2023", &body_of("second", 600))),
    ];

    let stats = Ingestor::new(&HtmlTextExtractor, &mut embedder, &repo, IngestSettings::default())
        .run(rows)
        .unwrap();

    assert_eq!(stats.kept, 2);
    assert_eq!(repo.count_documents().unwrap(), 1);
    assert!(
        repo.get_document("dup")
            .unwrap()
            .document
            .clean_text
            .starts_with("second")
    );
}

#[test]
fn csv_file_is_ingested_in_batches() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube_data.csv");

    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "RegInsightDocumentId,CUBEJurisdiction,CUBEIssuingBody,CUBEPublishedDate,RegOntologyId,RegInsightTextNative,RegInsightTitleNative,RegInsightSourceLink"
    )
    .unwrap();
    for i in 0..5 {
        writeln!(
            file,
            "doc-{i},Canada,OSFI,03/0{}/2023,ONT-1,\"{}\",Title {i},https://example.org/{i}",
            i + 1,
            body_of("guideline", 600)
        )
        .unwrap();
    }
    writeln!(file, "doc-bad,Canada,OSFI,2023-03-01,ONT-1,\"{}\",Bad,", body_of("x", 600)).unwrap();
    writeln!(file, "doc-short,Canada,OSFI,03/01/2023,ONT-1,too short,Short,").unwrap();
    drop(file);

    let settings = IngestSettings {
        batch_size: 2,
        ..IngestSettings::default()
    };
    let stats = ingest_csv(&path, &HtmlTextExtractor, &mut embedder, &repo, settings).unwrap();

    assert_eq!(stats.read, 7);
    assert_eq!(stats.kept, 5);
    assert_eq!(stats.persisted, 5);
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.skipped_invalid, 1);
    assert_eq!(stats.skipped_short, 1);
    assert_eq!(embedder.calls, 5);
    assert_eq!(repo.count_documents().unwrap(), 5);
    assert_eq!(
        repo.get_document("doc-3").unwrap().document.source_url.as_deref(),
        Some("https://example.org/3")
    );
}

#[test]
fn missing_csv_aborts_without_touching_the_store() {
    let db = TestDb::new();
    let repo = db.repo();
    let mut embedder = StubEmbedder::default();
    let dir = tempfile::tempdir().unwrap();

    let aborted = ingest_csv(
        &dir.path().join("absent.csv"),
        &HtmlTextExtractor,
        &mut embedder,
        &repo,
        IngestSettings::default(),
    )
    .unwrap_err();

    assert!(matches!(aborted.error, IngestError::SourceNotFound { .. }));
    assert_eq!(aborted.stats.read, 0);
    assert_eq!(repo.count_documents().unwrap(), 0);
}

#[test]
fn empty_batch_upsert_is_a_no_op() {
    let db = TestDb::new();

    assert_eq!(db.repo().upsert_documents(&[]).unwrap(), 0);
}
