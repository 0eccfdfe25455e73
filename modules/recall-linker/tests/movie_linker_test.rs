//! Movie linking against mocked catalog and knowledge-graph services.

mod harness;

use harness::*;
use recall_archive::testing::{title_record, MockCatalog, MockKnowledgeGraph};
use recall_common::{CandidateEntity, MovieCandidate, ResolutionResult, SourceKind};
use recall_linker::MentionResolver;

fn movie(result: &ResolutionResult) -> &MovieCandidate {
    match result.candidate() {
        Some(CandidateEntity::Movie(m)) => m,
        other => panic!("expected a movie candidate, got {other:?}"),
    }
}

#[tokio::test]
async fn mention_without_links_makes_no_calls() {
    let world = MovieWorld::matrix();
    let linker = world.linker();

    let results = linker
        .resolve(&mention("I think it was a 90s film about a guy in a pod?"))
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(world.external_calls(), 0);
}

#[tokio::test]
async fn originator_mentions_are_ignored() {
    let world = MovieWorld::matrix();
    let mut op = mention(&format!("Solved! {MATRIX_CATALOG_URL}"));
    op.is_original_poster = true;

    assert!(world.linker().resolve(&op).await.unwrap().is_empty());
    assert_eq!(world.external_calls(), 0);
}

#[tokio::test]
async fn catalog_link_verifies_against_the_encyclopedia() {
    let world = MovieWorld::matrix();
    let results = world
        .linker()
        .resolve(&mention(&format!("Pretty sure it's {MATRIX_CATALOG_URL}")))
        .await
        .unwrap();

    // The sequel shows up in the title search but cross-references another id.
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.is_confident());
    assert_eq!(result.source().kind, SourceKind::Catalog);
    assert_eq!(result.source().primary_url.as_deref(), Some(MATRIX_CATALOG_URL));
    assert_eq!(result.source().kg_url.as_deref(), Some(MATRIX_WIKI_URL));

    let candidate = movie(result);
    assert_eq!(candidate.catalog_id.as_str(), "tt0133093");
    assert_eq!(candidate.kg_title.as_deref(), Some("The Matrix"));
    assert_eq!(candidate.plot.as_deref(), Some("Neo wakes up in a pod."));
    assert_eq!(
        candidate.kg_record.as_ref().and_then(|r| r["id"].as_str()),
        Some("Q83495")
    );
}

#[tokio::test]
async fn unverified_encyclopedia_link_keeps_its_candidate() {
    let world = MovieWorld::matrix();
    let text = format!("Either {MATRIX_CATALOG_URL} or the remake {REMAKE_WIKI_URL}");

    let results = world.linker().resolve(&mention(&text)).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.is_confident()).count(), 1);

    // Catalog links come first.
    assert!(results[0].is_confident());
    assert_eq!(movie(&results[0]).catalog_id.as_str(), "tt0133093");

    let remake = &results[1];
    assert!(!remake.is_confident());
    assert_eq!(remake.source().kind, SourceKind::KnowledgeGraph);
    assert!(remake.reason().contains("tt9999999"), "{}", remake.reason());
    let candidate = movie(remake);
    assert_eq!(candidate.catalog_id.as_str(), "tt9999999");
    assert_eq!(candidate.kg_url.as_deref(), Some(REMAKE_WIKI_URL));
    // No plot section for the remake page; the catalog synopsis fills in.
    assert_eq!(candidate.plot.as_deref(), Some("A remake nobody asked for."));
}

#[tokio::test]
async fn same_id_linked_twice_is_resolved_once() {
    let world = MovieWorld::matrix();
    let text = format!("{MATRIX_CATALOG_URL} aka https://m.imdb.com/title/tt133093/plotsummary");

    let results = world.linker().resolve(&mention(&text)).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(world.catalog.calls(), 1);
}

#[tokio::test]
async fn unknown_catalog_id_is_unconfident_without_candidate() {
    let world = MovieWorld::matrix();
    let results = world
        .linker()
        .resolve(&mention("https://www.imdb.com/title/tt0000042/"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_confident());
    assert!(results[0].candidate().is_none());
    assert!(results[0].reason().contains("Unable to find catalog id tt0000042"));
}

#[tokio::test]
async fn catalog_synopsis_stands_in_when_nothing_verifies() {
    let catalog = MockCatalog::new().on_title(title_record(
        "tt0111161",
        "Obscure Short",
        &["Two men wait.", "Nothing happens."],
    ));
    let world = MovieWorld::new(catalog, MockKnowledgeGraph::new());

    let results = world
        .linker()
        .resolve(&mention("imdb.com/title/tt0111161"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_confident());
    let candidate = movie(&results[0]);
    assert_eq!(candidate.kg_title.as_deref(), Some("Obscure Short"));
    assert_eq!(candidate.kg_url, None);
    assert_eq!(candidate.plot.as_deref(), Some("Two men wait.\n\nNothing happens."));
}

#[tokio::test]
async fn encyclopedia_title_without_entity_is_recorded() {
    let world = MovieWorld::matrix();
    let results = world
        .linker()
        .resolve(&mention("https://en.wikipedia.org/wiki/Dark_City_(1998_film)"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_confident());
    assert_eq!(results[0].reason(), "Unable to resolve title->entity id");
}

#[tokio::test]
async fn transient_failures_propagate() {
    let world = MovieWorld::new(matrix_catalog().failing_transiently(1), matrix_graph());

    let err = world
        .linker()
        .resolve(&mention(MATRIX_CATALOG_URL))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn second_pass_is_served_from_cache() {
    let world = MovieWorld::matrix();
    let text = format!("{MATRIX_CATALOG_URL} {REMAKE_WIKI_URL}");

    let first = world.linker().resolve(&mention(&text)).await.unwrap();
    let calls = world.external_calls();
    let second = world.linker().resolve(&mention(&text)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(world.external_calls(), calls);
}
