//! Run a known workload across the pool with recording enabled, extract
//! the results, and verify attribution, persistence and rendering all
//! agree with the workload.
//!
//! This is the only test in this binary so it owns the process-global
//! profiler, registry and frame numbering.

#![cfg(feature = "profiling")]

use framescope::settings::Tag;
use framescope::{Barrier, WorkerPool};
use std::sync::Arc;
use std::time::Duration;

fn sub_sleeper() {
    framescope::profile_scope!(sub_sleeper);
}

fn sleeper(duration: Duration) {
    framescope::profile_scope!(sleeper, Tag::NONE);
    std::thread::sleep(duration);
    sub_sleeper();
}

fn sleeping_answer(duration: Duration) -> usize {
    framescope::profile_scope!(sleeping_answer);
    std::thread::sleep(duration);
    42
}

#[test]
fn workload_is_recorded_attributed_and_roundtrips() {
    const FRAMES: usize = 3;
    const WORKERS: usize = 3;

    assert!(framescope::name_thread!("MAIN").unwrap());
    assert_eq!(framescope::registry::current_thread_id().unwrap(), 0);
    assert_eq!(framescope::registry::current_thread_name().unwrap(), "MAIN");

    framescope::set_recording(true);
    assert_eq!(
        framescope::status(),
        framescope::ProfilerStatus::EnabledRecording
    );

    let pool = WorkerPool::with_setup(WORKERS, |total, current| {
        let _ = framescope::name_thread!(&format!("Worker{current}of{total}"));
    })
    .unwrap();

    for frame in 0..FRAMES {
        let answer = pool
            .add_task_with_result(|| sleeping_answer(Duration::from_millis(2)))
            .unwrap();

        let barrier = Arc::new(Barrier::new(2).unwrap());
        pool.add_task_with_barrier(&barrier, || sleeper(Duration::from_millis(1)))
            .unwrap();
        pool.add_task_with_barrier(&barrier, || sleeper(Duration::from_millis(1)))
            .unwrap();
        barrier.wait_for_all();

        assert_eq!(answer.get(), 42);

        // Work driven from the instrumented main thread as well.
        sleeper(Duration::from_millis(1));

        if frame + 1 != FRAMES {
            pool.wait_for_all();
        }
        framescope::next_frame();
    }

    let results = framescope::take_results();
    drop(pool);

    // Frames 0..FRAMES, the last one closed by extraction.
    assert_eq!(results.frames().len(), FRAMES);
    for (index, frame) in results.frames().iter().enumerate() {
        assert_eq!(frame.number, index as u64);
        assert!(frame.span.is_complete());
    }
    assert!(!results.is_frame_data_missing());
    assert!(results.has_any_records());

    // Main plus every worker registered, with the setup-assigned names.
    assert_eq!(results.thread_count(), 1 + WORKERS);
    assert_eq!(results.thread_name(0), "MAIN");
    for worker in 0..WORKERS {
        let name = results.thread_name(1 + worker);
        assert!(
            name.starts_with("Worker") && name.ends_with(&format!("of{WORKERS}")),
            "unexpected worker name {name:?}"
        );
    }

    // Workload accounting: per frame, 1 sleeping_answer + 3 sleeper
    // (each with a nested sub_sleeper).
    let mut by_scope: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut total = 0;
    for thread in 0..results.thread_count() {
        for event in results.events(thread) {
            let record = &results.scopes()[&event.key];
            *by_scope.entry(record.name.as_str()).or_default() += 1;
            total += 1;
            assert!(event.span.is_complete());
            assert!(event.depth >= 0);
        }
        // Per-thread ordering in the snapshot (sorted by start).
        let events = results.events(thread);
        for pair in events.windows(2) {
            assert!(pair[0].span.start_ns <= pair[1].span.start_ns);
        }
    }
    assert_eq!(by_scope["sleeping_answer"], FRAMES);
    assert_eq!(by_scope["sleeper"], FRAMES * 3);
    assert_eq!(by_scope["sub_sleeper"], FRAMES * 3);
    // With pool-profiling the pool's own scopes add to the total.
    assert!(total >= FRAMES * 7);

    // sub_sleeper always nests inside sleeper.
    let sub_key = results
        .scopes()
        .values()
        .find(|record| record.name == "sub_sleeper")
        .unwrap()
        .key;
    for thread in 0..results.thread_count() {
        for event in results.events(thread) {
            if event.key == sub_key {
                assert_eq!(event.depth, 1);
            }
        }
    }

    // Persist, reload, compare, render.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workload.profres");
    results.write_to_file(&path).unwrap();
    let loaded = framescope::ProfileSnapshot::load_from_file(&path).unwrap();
    assert_eq!(loaded, results);

    let text = loaded.render_text();
    assert!(text.contains("THREAD: MAIN"));
    assert!(text.contains("FRAME: 0"));
    assert!(text.contains("SCOPE: sleeper"));

    // The draw entry point reports Drawn with the draw-model feature and
    // Unavailable without it.
    let expected = if cfg!(feature = "draw-model") {
        framescope::DrawOutcome::Drawn
    } else {
        framescope::DrawOutcome::Unavailable
    };
    assert_eq!(loaded.draw(), expected);

    #[cfg(feature = "draw-model")]
    {
        let model = loaded.draw_model();
        assert_eq!(model.draw(), framescope::DrawOutcome::Drawn);
        assert_eq!(model.max_depth(0), 1);
        let mut visible = Vec::new();
        let first = loaded.frames()[0].span;
        model.events_in_window(0, first.start_ns, first.end_ns, &mut visible);
        assert!(!visible.is_empty());
    }
}
