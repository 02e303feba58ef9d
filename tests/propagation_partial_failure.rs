mod common;

use classreg::schedule::Weekday;
use classreg::store::DocumentStore;
use classreg::sync::{PropagationStage, ScheduleError};
use common::{draft, fast_engine, section, subject, teacher, FlakyStore};

#[tokio::test]
async fn section_outage_surfaces_partial_success_and_reconcile_converges() {
    let store = FlakyStore::new();
    // More failures than the add's retry budget (3 attempts), few enough
    // that the later reconcile pass gets through.
    store.fail_section_writes(5);

    let engine = fast_engine(store);
    let t = teacher("t-nakamura");
    let su = subject("CS101");
    let se = section("CS101-A");

    let err = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Tuesday], "09:00", "10:30", "Hall 1", "CS101", Some("CS101-A")),
        )
        .await
        .unwrap_err();

    // Partial success: the failure names the stage and carries the
    // committed schedule so the caller does not resubmit it.
    let ScheduleError::Propagation { stage, committed, .. } = err else {
        panic!("expected propagation failure, got {err:?}");
    };
    assert_eq!(stage, PropagationStage::SectionCopy);

    // The authoritative write stands and the subject copy landed.
    let schedules = engine.instructor_schedules(&t).await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].id, committed.id);
    assert_eq!(engine.store().subject_schedule_copies(&su).await.unwrap().len(), 1);
    assert!(engine.store().inner.section_schedule(&se).is_none());

    // The saga stays journaled until reconciliation replays it.
    assert_eq!(engine.journal().pending_count().unwrap(), 1);

    // Store heals (failure budget exhausted); reconcile settles the saga.
    let settled = engine.reconcile().await;
    assert_eq!(settled, 1);
    assert_eq!(engine.journal().pending_count().unwrap(), 0);

    let section_copy = engine.store().inner.section_schedule(&se).unwrap();
    assert_eq!(section_copy.schedule.id, committed.id);

    // Replaying the subject upsert did not duplicate the copy.
    assert_eq!(engine.store().subject_schedule_copies(&su).await.unwrap().len(), 1);
}

#[tokio::test]
async fn transient_outage_within_retry_budget_is_invisible_to_the_caller() {
    let store = FlakyStore::new();
    store.fail_subject_upserts(2);

    let engine = fast_engine(store);
    let t = teacher("t-nakamura");
    let su = subject("CS101");

    engine
        .add_schedule(&t, draft(&[Weekday::Tuesday], "09:00", "10:30", "Hall 1", "CS101", None))
        .await
        .unwrap();

    assert_eq!(engine.store().subject_schedule_copies(&su).await.unwrap().len(), 1);
    assert_eq!(engine.journal().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn failed_cleanup_is_finished_by_reconciliation() {
    let store = FlakyStore::new();
    let engine = fast_engine(store);
    let t = teacher("t-nakamura");
    let su = subject("CS101");

    let committed = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Thursday], "09:00", "10:30", "Hall 1", "CS101", Some("CS101-B")),
        )
        .await
        .unwrap();

    engine.store().fail_subject_removes(5);
    let err = engine.remove_schedule(&t, &committed.id).await.unwrap_err();
    assert!(matches!(err, ScheduleError::Propagation { .. }));

    // Authoritative deletion already happened; the stale copy remains.
    assert!(engine.instructor_schedules(&t).await.unwrap().is_empty());
    assert_eq!(engine.store().subject_schedule_copies(&su).await.unwrap().len(), 1);
    assert_eq!(engine.journal().pending_count().unwrap(), 1);

    let settled = engine.reconcile().await;
    assert_eq!(settled, 1);
    assert!(engine.store().subject_schedule_copies(&su).await.unwrap().is_empty());
    assert!(engine.store().inner.section_schedule(&section("CS101-B")).is_none());
}

#[tokio::test]
async fn reconcile_leaves_still_failing_sagas_pending() {
    let store = FlakyStore::new();
    store.fail_section_writes(100);

    let engine = fast_engine(store);
    let t = teacher("t-nakamura");

    let _ = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Tuesday], "09:00", "10:30", "Hall 1", "CS101", Some("CS101-A")),
        )
        .await;

    assert_eq!(engine.journal().pending_count().unwrap(), 1);

    // Outage persists: the marker survives with a bumped attempt count.
    let settled = engine.reconcile().await;
    assert_eq!(settled, 0);
    assert_eq!(engine.journal().pending_count().unwrap(), 1);
    assert!(engine.journal().outstanding(10).unwrap()[0].attempts >= 1);
}
