mod common;

use classreg::schedule::Weekday;
use classreg::store::{DocumentStore, MemoryStore};
use common::{draft, fast_engine, section, subject, teacher};

#[tokio::test]
async fn add_propagates_copies_and_remove_cleans_them_up() {
    let engine = fast_engine(MemoryStore::new());
    let t = teacher("t-ito");
    let su = subject("CHEM110");
    let se = section("CHEM110-A");

    let committed = engine
        .add_schedule(
            &t,
            draft(
                &[Weekday::Monday, Weekday::Wednesday],
                "10:00",
                "11:30",
                "Lab 2",
                "CHEM110",
                Some("CHEM110-A"),
            ),
        )
        .await
        .unwrap();

    // Subject holds exactly one copy equal to the committed schedule.
    let copies = engine.store().subject_schedule_copies(&su).await.unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].schedule, committed);
    assert_eq!(copies[0].instructor_id, t);

    // Section mirrors the same schedule.
    let section_copy = engine.store().section_schedule(&se).unwrap();
    assert_eq!(section_copy.schedule, committed);

    // Nothing is left pending once propagation succeeded.
    assert_eq!(engine.journal().pending_count().unwrap(), 0);

    engine.remove_schedule(&t, &committed.id).await.unwrap();

    assert!(engine.instructor_schedules(&t).await.unwrap().is_empty());
    assert!(engine.store().subject_schedule_copies(&su).await.unwrap().is_empty());
    assert!(engine.store().section_schedule(&se).is_none());
    assert_eq!(engine.journal().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn removing_twice_succeeds_both_times() {
    let engine = fast_engine(MemoryStore::new());
    let t = teacher("t-ito");

    let committed = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Friday], "13:00", "14:00", "Room C", "BIO150", Some("BIO150-B")),
        )
        .await
        .unwrap();

    engine.remove_schedule(&t, &committed.id).await.unwrap();
    // A retried delete converges instead of erroring.
    engine.remove_schedule(&t, &committed.id).await.unwrap();

    assert!(engine.instructor_schedules(&t).await.unwrap().is_empty());
}

#[tokio::test]
async fn removing_one_schedule_leaves_siblings_alone() {
    let engine = fast_engine(MemoryStore::new());
    let t = teacher("t-ito");
    let su = subject("CHEM110");

    let morning = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Monday], "08:00", "09:00", "Lab 2", "CHEM110", None),
        )
        .await
        .unwrap();
    let afternoon = engine
        .add_schedule(
            &t,
            draft(&[Weekday::Monday], "14:00", "15:00", "Lab 2", "CHEM110", None),
        )
        .await
        .unwrap();

    engine.remove_schedule(&t, &morning.id).await.unwrap();

    let schedules = engine.instructor_schedules(&t).await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].id, afternoon.id);

    let copies = engine.store().subject_schedule_copies(&su).await.unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(*copies[0].schedule_id(), afternoon.id);
}

#[tokio::test]
async fn schedules_of_different_instructors_do_not_interact() {
    let engine = fast_engine(MemoryStore::new());
    let t1 = teacher("t-ito");
    let t2 = teacher("t-okafor");
    let su = subject("CHEM110");

    // Same slot, different instructors: no conflict between them.
    engine
        .add_schedule(&t1, draft(&[Weekday::Monday], "08:00", "09:00", "Lab 2", "CHEM110", None))
        .await
        .unwrap();
    engine
        .add_schedule(&t2, draft(&[Weekday::Monday], "08:00", "09:00", "Lab 3", "CHEM110", None))
        .await
        .unwrap();

    let copies = engine.store().subject_schedule_copies(&su).await.unwrap();
    assert_eq!(copies.len(), 2);
}
