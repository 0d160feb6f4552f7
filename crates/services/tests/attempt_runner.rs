use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use exam_core::model::{
    AttemptPhase, AttemptSubmission, AvailabilityWindow, NavDirection, Question, QuestionId,
    StudentId, SubmissionResult, SubmitFailure, TestDefinition, TestId,
};
use exam_core::time::fixed_now;
use services::{AttemptCommand, AttemptRunner, AttemptService, Clock};
use storage::{AssessmentStore, InMemoryAssessmentStore, StoreError};

const TICK: Duration = Duration::from_secs(1);

/// Wraps the in-memory store with network latency on submit.
#[derive(Clone)]
struct SlowStore {
    inner: InMemoryAssessmentStore,
    latency: Duration,
}

#[async_trait]
impl AssessmentStore for SlowStore {
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, StoreError> {
        self.inner.fetch_test(id).await
    }

    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, StoreError> {
        tokio::time::sleep(self.latency).await;
        self.inner.submit_attempt(submission).await
    }
}

fn seed(store: &InMemoryAssessmentStore, minutes: i64) -> TestId {
    let questions = (1..=3)
        .map(|i| {
            Question::new(
                QuestionId::new(format!("Q{i}")),
                "Pick",
                vec!["a".into(), "b".into()],
            )
            .unwrap()
        })
        .collect();
    let window = AvailabilityWindow::new(fixed_now(), fixed_now() + ChronoDuration::hours(2))
        .unwrap();
    let id = TestId::new("runner-test");
    store
        .insert_test(TestDefinition::new(id.clone(), "Runner", questions, minutes, window).unwrap())
        .unwrap();
    id
}

async fn start(
    store: Arc<dyn AssessmentStore>,
    test_id: &TestId,
) -> (AttemptRunner, services::AttemptHandle) {
    let controller = AttemptService::new(Clock::fixed(fixed_now()), store)
        .load_test(StudentId::new("stu"), test_id)
        .await
        .unwrap();
    AttemptRunner::new(controller, TICK)
}

#[tokio::test(start_paused = true)]
async fn clock_expiry_ends_the_run() {
    let store = InMemoryAssessmentStore::new();
    let test_id = seed(&store, 1);
    let (runner, handle) = start(Arc::new(store.clone()), &test_id).await;
    let task = tokio::spawn(runner.run());

    assert!(handle.send(AttemptCommand::AnswerCurrent("a".into())).await);
    assert!(handle.send(AttemptCommand::Navigate(NavDirection::Next)).await);
    assert!(handle.send(AttemptCommand::ToggleCurrentFlag).await);
    assert!(handle
        .send(AttemptCommand::Answer {
            question: QuestionId::new("Q3"),
            option: "b".into(),
        })
        .await);

    let controller = task.await.unwrap();
    assert_eq!(controller.phase(), AttemptPhase::Submitted);
    assert_eq!(store.submit_calls().unwrap(), 1);

    let submitted = &store.submissions().unwrap()[0];
    assert_eq!(submitted.answers().len(), 2);
    assert!(!submitted.answers().contains_key(&QuestionId::new("Q2")));

    let view = handle.view();
    assert_eq!(view.phase, AttemptPhase::Submitted);
    assert_eq!(view.remaining_secs, 0);
    assert!(!handle.send(AttemptCommand::Submit).await);
}

#[tokio::test(start_paused = true)]
async fn manual_submit_racing_expiry_delivers_once() {
    let inner = InMemoryAssessmentStore::new();
    let test_id = seed(&inner, 1);
    let store = SlowStore {
        inner: inner.clone(),
        latency: Duration::from_secs(3),
    };
    let (runner, handle) = start(Arc::new(store), &test_id).await;
    let task = tokio::spawn(runner.run());

    // Land the click on the same instant as the final tick, then keep clicking
    // while the request is in flight.
    tokio::time::sleep(Duration::from_secs(60)).await;
    for _ in 0..3 {
        let _ = handle.send(AttemptCommand::Submit).await;
    }

    let controller = task.await.unwrap();
    assert_eq!(controller.phase(), AttemptPhase::Submitted);
    assert_eq!(inner.submit_calls().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn view_reports_submitting_while_request_is_in_flight() {
    let inner = InMemoryAssessmentStore::new();
    let test_id = seed(&inner, 10);
    let store = SlowStore {
        inner: inner.clone(),
        latency: Duration::from_secs(10),
    };
    let (runner, handle) = start(Arc::new(store), &test_id).await;
    let mut views = handle.subscribe();
    let task = tokio::spawn(runner.run());

    handle.send(AttemptCommand::AnswerCurrent("a".into())).await;
    handle.send(AttemptCommand::Submit).await;
    views
        .wait_for(|view| view.phase == AttemptPhase::Submitting)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    let view = handle.view();
    assert_eq!(view.phase, AttemptPhase::Submitting);
    assert!(!view.can_submit);
    assert_eq!(view.remaining_secs, 600);
    assert_eq!(inner.submit_calls().unwrap(), 0);

    let controller = task.await.unwrap();
    assert_eq!(controller.phase(), AttemptPhase::Submitted);
    assert_eq!(handle.view().phase, AttemptPhase::Submitted);
    assert_eq!(inner.submit_calls().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_waits_for_manual_retry() {
    let store = InMemoryAssessmentStore::new();
    let test_id = seed(&store, 10);
    store.fail_next_submit(StoreError::Unauthorized).unwrap();
    let (runner, handle) = start(Arc::new(store.clone()), &test_id).await;
    let mut views = handle.subscribe();
    let task = tokio::spawn(runner.run());

    handle.send(AttemptCommand::AnswerCurrent("b".into())).await;
    handle.send(AttemptCommand::Submit).await;
    views
        .wait_for(|view| view.phase == AttemptPhase::Failed)
        .await
        .unwrap();
    assert_eq!(handle.view().last_failure, Some(SubmitFailure::AuthExpired));

    // Plenty of time passes; the stopped clock must not resubmit on its own.
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    assert_eq!(store.submit_calls().unwrap(), 1);

    handle.send(AttemptCommand::Submit).await;
    let controller = task.await.unwrap();
    assert_eq!(controller.phase(), AttemptPhase::Submitted);
    assert_eq!(store.submit_calls().unwrap(), 2);
    assert_eq!(
        store.submissions().unwrap()[0]
            .answers()
            .get(&QuestionId::new("Q1"))
            .map(String::as_str),
        Some("b")
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_abandons_the_attempt() {
    let store = InMemoryAssessmentStore::new();
    let test_id = seed(&store, 10);
    let (runner, handle) = start(Arc::new(store.clone()), &test_id).await;
    let task = tokio::spawn(runner.run());

    handle.send(AttemptCommand::AnswerCurrent("a".into())).await;
    drop(handle);

    let controller = task.await.unwrap();
    assert_eq!(controller.phase(), AttemptPhase::InProgress);
    assert_eq!(controller.answers().len(), 1);
    assert_eq!(store.submit_calls().unwrap(), 0);
}
