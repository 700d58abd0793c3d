
use gridwatch::error::GridError;
use gridwatch::scheduler::{classify, JobHandle, JobId, LifecycleState};
use test_harness::{listing, ScriptedQueue, Step};

#[test]
fn test_job_id_conversions() {
    assert_eq!(JobId::from(12345u64), JobId::from("12345"));
    assert_eq!(JobId::from("12345".to_string()).as_str(), "12345");
    assert_eq!(JobId::new("7").to_string(), "7");
}

#[test]
fn test_new_handle_has_no_observation() {
    let handle = JobHandle::with_name("12345", "python");
    assert_eq!(handle.id().as_str(), "12345");
    assert_eq!(handle.name(), Some("python"));
    assert!(handle.observation().is_none());
}

#[test]
fn test_running_job_from_snapshot() {
    let snapshot = listing(&[("12345", "r")]);
    let mut handle = JobHandle::new("12345");

    let observation = handle.apply_snapshot(&snapshot);
    assert_eq!(observation.status.as_deref(), Some("r"));
    assert_eq!(classify(observation.status.as_deref()), LifecycleState::Running);
    assert!(observation.is_running());
    assert!(observation.is_present());
    assert!(!observation.is_error());
}

#[test]
fn test_absent_job_is_not_present() {
    let snapshot = listing(&[("11111", "r"), ("22222", "qw")]);
    for id in ["33333", "1111", "111111", "kellys04"] {
        let mut handle = JobHandle::new(id);
        let observation = handle.apply_snapshot(&snapshot);
        assert!(!observation.is_present(), "{id} should be absent");
        assert_eq!(observation.status, None);
        assert_eq!(observation.state, LifecycleState::Unknown);
    }
}

#[test]
fn test_apply_snapshot_is_idempotent() {
    let snapshot = listing(&[("12345", "Eqw"), ("12346", "qw")]);
    let mut handle = JobHandle::new("12345");

    let first = handle.apply_snapshot(&snapshot).clone();
    let second = handle.apply_snapshot(&snapshot).clone();
    assert!(first.same_state(&second));
    assert_eq!(second.state, LifecycleState::Error);
    assert!(second.observed_at >= first.observed_at);
}

#[tokio::test]
async fn test_running_predicate_polls_the_queue() {
    let queue = ScriptedQueue::listings(vec![listing(&[("12345", "r")])]);
    let mut handle = JobHandle::new("12345");

    assert!(handle.is_running(queue.as_ref()).await.unwrap());
    assert_eq!(queue.calls(), 1);
}

#[tokio::test]
async fn test_each_predicate_is_a_fresh_query() {
    let queue = ScriptedQueue::listings(vec![
        listing(&[("12345", "qw")]),
        listing(&[("12345", "r")]),
        listing(&[("12345", "Eqw")]),
    ]);
    let mut handle = JobHandle::new("12345");

    assert!(handle.is_present(queue.as_ref()).await.unwrap());
    assert!(handle.is_running(queue.as_ref()).await.unwrap());
    assert!(handle.is_error(queue.as_ref()).await.unwrap());
    // script exhausted: the queue is now empty
    assert!(!handle.is_present(queue.as_ref()).await.unwrap());
    assert_eq!(queue.calls(), 4);
}

#[tokio::test]
async fn test_refresh_twice_on_unchanged_queue() {
    let text = listing(&[("12345", "qw")]);
    let queue = ScriptedQueue::listings(vec![text.clone(), text]);
    let mut handle = JobHandle::new("12345");

    let first = handle.refresh(queue.as_ref()).await.unwrap().clone();
    let second = handle.refresh(queue.as_ref()).await.unwrap().clone();
    assert!(first.same_state(&second));
    assert_eq!(second.state, LifecycleState::Waiting);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_observation() {
    let queue = ScriptedQueue::new(vec![Step::Listing(listing(&[("12345", "r")])), Step::Fail]);
    let mut handle = JobHandle::new("12345");

    handle.refresh(queue.as_ref()).await.unwrap();
    let err = handle.refresh(queue.as_ref()).await.unwrap_err();
    assert!(matches!(err, GridError::CommandFailed { .. }));

    let observation = handle.observation().unwrap();
    assert!(observation.is_running());
    assert!(observation.is_present());
}

#[tokio::test]
async fn test_empty_queue_is_not_an_error() {
    let queue = ScriptedQueue::listings(vec![String::new()]);
    let mut handle = JobHandle::new("12345");
    assert!(!handle.is_present(queue.as_ref()).await.unwrap());
}
