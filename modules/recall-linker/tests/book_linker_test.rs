//! Book linking through the rendered secondary catalog and the knowledge graph.

mod harness;

use harness::*;
use recall_common::{BookCandidate, CandidateEntity, ResolutionResult, SourceKind};
use recall_linker::MentionResolver;

fn book(result: &ResolutionResult) -> &BookCandidate {
    match result.candidate() {
        Some(CandidateEntity::Book(b)) => b,
        other => panic!("expected a book candidate, got {other:?}"),
    }
}

#[tokio::test]
async fn shelf_page_is_scraped_once() {
    let world = BookWorld::hobbit();

    let results = world
        .linker()
        .resolve(&mention(&format!("I think it's {HOBBIT_SHELF_URL}")))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_confident());
    assert_eq!(results[0].source().kind, SourceKind::Bookshelf);
    let candidate = book(&results[0]);
    assert_eq!(candidate.isbn10.as_ref().unwrap().as_str(), "0618260307");
    assert_eq!(candidate.isbn13.as_ref().unwrap().as_str(), "9780618260300");
    assert_eq!(candidate.work_id.as_deref(), Some("1540236"));
    assert_eq!(candidate.title.as_deref(), Some("The Hobbit"));
    assert_eq!(
        candidate.description.as_deref(),
        Some("In a hole in the ground there lived a hobbit.")
    );

    world.linker().resolve(&mention(HOBBIT_SHELF_URL)).await.unwrap();
    assert_eq!(world.renderer.calls(), 1);
}

#[tokio::test]
async fn unrenderable_shelf_page_is_unconfident() {
    let world = BookWorld::hobbit();
    let results = world
        .linker()
        .resolve(&mention("https://www.goodreads.com/book/show/1.Nothing"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_confident());
    assert!(results[0].candidate().is_none());
}

#[tokio::test]
async fn encyclopedia_book_carries_standard_ids() {
    let world = BookWorld::hobbit();
    let results = world
        .linker()
        .resolve(&mention(HOBBIT_WIKI_URL))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_confident());
    let candidate = book(&results[0]);
    assert_eq!(candidate.isbn10.as_ref().unwrap().as_str(), "0618260307");
    assert_eq!(candidate.isbn13.as_ref().unwrap().as_str(), "9780618260300");
    assert_eq!(candidate.description.as_deref(), Some("Bilbo leaves the Shire."));
    assert_eq!(candidate.work_id, None);
}

#[tokio::test]
async fn work_index_fills_work_and_title() {
    let world = BookWorld::hobbit();
    let results = world
        .linker_with_works()
        .resolve(&mention(HOBBIT_WIKI_URL))
        .await
        .unwrap();

    let candidate = book(&results[0]);
    assert_eq!(candidate.work_id.as_deref(), Some("1540236"));
    assert_eq!(candidate.title.as_deref(), Some("The Hobbit, or There and Back Again"));
}

#[tokio::test]
async fn conflicting_standard_ids_are_recorded() {
    let world = BookWorld::hobbit();
    let results = world
        .linker()
        .resolve(&mention(OMNIBUS_WIKI_URL))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_confident());
    assert!(results[0].candidate().is_none());
    assert!(results[0].reason().contains("conflicting P957"), "{}", results[0].reason());
}

#[tokio::test]
async fn shelf_links_come_before_encyclopedia_links() {
    let world = BookWorld::hobbit();
    let text = format!("{HOBBIT_WIKI_URL} and also {HOBBIT_SHELF_URL}");

    let results = world.linker().resolve(&mention(&text)).await.unwrap();

    let kinds: Vec<SourceKind> = results.iter().map(|r| r.source().kind).collect();
    assert_eq!(kinds, [SourceKind::Bookshelf, SourceKind::KnowledgeGraph]);
}
