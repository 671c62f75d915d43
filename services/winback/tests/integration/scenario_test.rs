use mandate_domain::outreach::{FollowUpKind, Priority};
use mandate_testing::clock::day;
use mandate_winback::domain::types::{AttemptStatus, AttemptTarget, REVIEW_CHANNEL};
use mandate_winback::usecase::enroll::{EnrollLeadUseCase, EnrollmentTarget};

use crate::helpers::{MemoryStore, MockEmailGateway, cycle, fixture_sequence, test_lead};

#[tokio::test]
async fn secuencia_precio_runs_from_enrollment_to_review() {
    let store = MemoryStore::new();
    store.add_account();
    let gateway = MockEmailGateway::new();
    let sent = gateway.sent_handle();
    let lead = test_lead("Acme Corp");
    let sequence = fixture_sequence("secuencia_precio.json");
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());

    let enroll = EnrollLeadUseCase {
        attempts: store.clone(),
        leads: store.clone(),
        sequences: store.clone(),
    };
    let enrollment = enroll
        .execute(lead.id, EnrollmentTarget::LostReason("Precio".to_owned()), day(0))
        .await
        .unwrap()
        .expect("lost reason matches the fixture trigger");
    assert_eq!(enrollment.sequence_id, sequence.id);
    assert_eq!(enrollment.scheduled_at, day(0));

    // Cycle 1, day 0: the email step.
    let summary = cycle(&store, &gateway).execute(day(0)).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.emails_sent, 1);
    assert_eq!(store.attempt(enrollment.attempt_id).status, AttemptStatus::Sent);
    assert_eq!(store.lead(lead.id).last_winback_attempt, Some(day(0)));
    {
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Re-engagement");
        assert!(sent[0].body.contains("Acme Corp"));
    }

    let call = store
        .attempts_except(&[enrollment.attempt_id])
        .pop()
        .expect("call step enqueued");
    assert_eq!(call.target, AttemptTarget::Step { index: 1 });
    assert_eq!(call.scheduled_at, day(3));

    // Nothing due in between.
    let idle = cycle(&store, &gateway).execute(day(2)).await.unwrap();
    assert_eq!(idle.processed, 0);

    // Cycle 2, day 3: the call step, which is the last one.
    let summary = cycle(&store, &gateway).execute(day(3)).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.call_tasks_created, 1);
    assert_eq!(store.attempt(call.id).status, AttemptStatus::Sent);
    assert_eq!(store.lead(lead.id).last_winback_attempt, Some(day(3)));

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task.kind, FollowUpKind::Call);
    assert!(tasks[0].task.title.contains("Acme Corp"));
    assert!(tasks[0].task.description.starts_with("Follow up on pricing"));
    assert_eq!(tasks[0].task.priority, Priority::High);
    assert_eq!(tasks[0].task.due_at, day(3));

    let review = store
        .attempts_except(&[enrollment.attempt_id, call.id])
        .pop()
        .expect("review enqueued");
    assert_eq!(review.target, AttemptTarget::Review);
    assert_eq!(review.channel, REVIEW_CHANNEL);
    assert_eq!(review.scheduled_at, day(10));

    // The lead opened the day-0 email.
    store.with(|w| w.tracked[0].open_count = 1);

    // Cycle 3, day 10: the review.
    let summary = cycle(&store, &gateway).execute(day(10)).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.leads_engaging, 1);
    assert_eq!(store.attempt(review.id).status, AttemptStatus::Completed);
    let lead = store.lead(lead.id).lead;
    assert_eq!(lead.winback_stage.as_deref(), Some("engaging"));
    assert_eq!(lead.score, 70);

    assert_eq!(store.audit().len(), 3, "one audit entry per non-empty cycle");
}
