//! Ground-truth driver: per-thread output, resumability, failure isolation
//! and interrupts.

mod harness;

use harness::*;
use recall_linker::{GroundTruthDriver, Interrupts};
use serde_json::Value;

fn matrix_threads() -> Vec<recall_common::Thread> {
    vec![
        solved_thread(
            "t1",
            &format!("The Matrix? {MATRIX_CATALOG_URL}"),
            &format!("Maybe the remake {REMAKE_WIKI_URL}"),
        ),
        solved_thread("t2", "No link here, sorry", "nor here"),
    ]
}

#[tokio::test]
async fn solved_path_results_are_written_per_thread() {
    let world = MovieWorld::matrix();
    let linker = world.linker();
    let out = world.out_dir("gt");
    let (_tx, mut interrupts) = Interrupts::channel();

    let stats = GroundTruthDriver::new(&linker, &out)
        .unwrap()
        .run(&matrix_threads(), &mut interrupts)
        .await
        .unwrap();

    assert_eq!(stats.threads_processed, 2);
    assert_eq!(stats.items_written, 1);
    assert_eq!(stats.confident, 1);
    assert!(!stats.interrupted);

    let rows: Value = serde_json::from_slice(&std::fs::read(out.join("t1.json")).unwrap()).unwrap();
    let rows = rows.as_array().unwrap();
    // Only the helper's answer; the aside is off the solved path and the
    // originator's confirmation is never resolved.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["confident"], true);
    assert_eq!(rows[0]["entity"]["catalog_id"], "tt0133093");
    assert_eq!(rows[0]["uttrance"]["reply_id"], "a");

    let empty: Value = serde_json::from_slice(&std::fs::read(out.join("t2.json")).unwrap()).unwrap();
    assert_eq!(empty, serde_json::json!([]));
}

#[tokio::test]
async fn rerun_skips_finished_threads_and_reproduces_output() {
    let world = MovieWorld::matrix();
    let threads = matrix_threads();
    let (_tx, mut interrupts) = Interrupts::channel();

    let linker = world.linker();
    GroundTruthDriver::new(&linker, &world.out_dir("first"))
        .unwrap()
        .run(&threads, &mut interrupts)
        .await
        .unwrap();
    let calls = world.external_calls();

    // Same output directory: nothing left to do.
    let stats = GroundTruthDriver::new(&linker, &world.out_dir("first"))
        .unwrap()
        .run(&threads, &mut interrupts)
        .await
        .unwrap();
    assert_eq!(stats.threads_skipped, 2);
    assert_eq!(stats.threads_processed, 0);

    // Fresh output directory, fresh process: everything comes from cache.
    let linker = world.linker();
    GroundTruthDriver::new(&linker, &world.out_dir("second"))
        .unwrap()
        .run(&threads, &mut interrupts)
        .await
        .unwrap();

    assert_eq!(world.external_calls(), calls);
    for id in ["t1", "t2"] {
        let first = std::fs::read(world.out_dir("first").join(format!("{id}.json"))).unwrap();
        let second = std::fs::read(world.out_dir("second").join(format!("{id}.json"))).unwrap();
        assert_eq!(first, second, "{id}");
    }
}

#[tokio::test]
async fn failing_thread_is_skipped_and_the_run_continues() {
    let world = MovieWorld::new(matrix_catalog().failing_transiently(1), matrix_graph());
    let linker = world.linker();
    let out = world.out_dir("gt");
    let threads = vec![
        solved_thread("t1", MATRIX_CATALOG_URL, ""),
        solved_thread("t2", MATRIX_CATALOG_URL, ""),
    ];
    let (_tx, mut interrupts) = Interrupts::channel();

    let stats = GroundTruthDriver::new(&linker, &out)
        .unwrap()
        .run(&threads, &mut interrupts)
        .await
        .unwrap();

    assert_eq!(stats.threads_failed, 1);
    assert_eq!(stats.threads_processed, 1);
    assert!(!out.join("t1.json").exists());
    assert!(out.join("t2.json").exists());
}

#[tokio::test]
async fn interrupt_stops_the_run_immediately() {
    let world = MovieWorld::matrix();
    let linker = world.linker();
    let out = world.out_dir("gt");
    let (tx, mut interrupts) = Interrupts::channel();
    tx.interrupt();

    let stats = GroundTruthDriver::new(&linker, &out)
        .unwrap()
        .run(&matrix_threads(), &mut interrupts)
        .await
        .unwrap();

    assert!(stats.interrupted);
    assert_eq!(stats.threads_processed, 0);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    assert_eq!(world.external_calls(), 0);
}
