use chrono::Duration;

use mandate_domain::outreach::{FollowUpKind, Priority};
use mandate_testing::clock::day;
use mandate_winback::domain::types::{
    AttemptStatus, AttemptTarget, CycleSummary, REVIEW_CHANNEL,
};
use mandate_winback::usecase::cycle::RunCycleUseCase;

use crate::helpers::{MemoryStore, MockEmailGateway, cycle, step, test_lead, test_sequence};

// ── No-op cycle ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_do_nothing_when_no_attempt_is_due() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "email")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let future = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "email",
        day(5),
    );

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert_eq!(summary, CycleSummary::default());
    assert_eq!(store.attempt(future).status, AttemptStatus::Pending);
    assert!(store.audit().is_empty(), "no-op cycle must not write an audit entry");
    assert!(store.lead(lead.id).last_winback_attempt.is_none());
}

// ── Channel coverage ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_dispatch_every_channel() {
    let store = MemoryStore::new();
    store.add_account();
    let gateway = MockEmailGateway::new();
    let sent = gateway.sent_handle();

    let mut ids = Vec::new();
    for (channel, name) in [
        ("email", "Email Lead"),
        ("call", "Call Lead"),
        ("linkedin", "Linkedin Lead"),
        ("whatsapp", "Whatsapp Lead"),
        ("sms", "Sms Lead"),
    ] {
        let lead = test_lead(name);
        let sequence = test_sequence(channel, vec![step(0, channel), step(2, "email")]);
        store.add_lead(lead.clone());
        store.add_sequence(sequence.clone());
        ids.push(store.add_attempt(
            lead.id,
            sequence.id,
            AttemptTarget::Step { index: 0 },
            channel,
            day(0),
        ));
    }

    let summary = cycle(&store, &gateway).execute(day(0)).await.unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.emails_sent, 1);
    assert_eq!(summary.call_tasks_created, 1);
    assert_eq!(summary.linkedin_tasks_created, 1);
    assert_eq!(summary.errors, 0);

    let statuses: Vec<_> = ids.iter().map(|id| store.attempt(*id).status).collect();
    assert_eq!(
        statuses,
        vec![
            AttemptStatus::Sent,
            AttemptStatus::Sent,
            AttemptStatus::Sent,
            AttemptStatus::Skipped,
            AttemptStatus::Skipped,
        ]
    );
    let whatsapp = store.attempt(ids[3]);
    assert_eq!(whatsapp.notes.as_deref(), Some("unsupported channel `whatsapp`"));
    let sms = store.attempt(ids[4]);
    assert_eq!(sms.notes.as_deref(), Some("unsupported channel `sms`"));
    assert_eq!(sms.response.as_ref().unwrap()["error"], "UNSUPPORTED_CHANNEL");

    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(store.tracked().len(), 1);
    let kinds: Vec<_> = store.tasks().iter().map(|t| t.task.kind).collect();
    assert_eq!(kinds, vec![FollowUpKind::Call, FollowUpKind::Linkedin]);

    let email = store.attempt(ids[0]);
    assert_eq!(email.response.as_ref().unwrap()["handler"], "email");
    assert_eq!(email.executed_at, Some(day(0)));
}

#[tokio::test]
async fn should_fail_email_without_account_but_not_count_error() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "email"), step(3, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "email",
        day(0),
    );

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 0);
    let attempt = store.attempt(id);
    assert_eq!(attempt.status, AttemptStatus::Failed);
    assert_eq!(
        attempt.notes.as_deref(),
        Some("no active email account configured")
    );
    assert!(
        store.attempts_except(&[id]).is_empty(),
        "a failed step does not advance the sequence"
    );
    assert_eq!(store.lead(lead.id).last_winback_attempt, Some(day(0)));
}

#[tokio::test]
async fn should_render_step_template_and_fall_back_to_default_subject() {
    let store = MemoryStore::new();
    store.add_account();
    let gateway = MockEmailGateway::new();
    let sent = gateway.sent_handle();
    let lead = test_lead("Laura");
    let mut first = step(0, "email");
    first.message = Some("Hola {{nombre}} de {{empresa}}".to_owned());
    let sequence = test_sequence("Secuencia", vec![first]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "email",
        day(0),
    );

    cycle(&store, &gateway).execute(day(0)).await.unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].to, "laura@leads.test");
    assert_eq!(sent[0].body, "Hola Laura de Laura");
    assert_eq!(
        sent[0].subject,
        mandate_winback::domain::types::FALLBACK_SUBJECT
    );
}

// ── Sequence progression ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_schedule_next_step_from_sequence_start() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence(
        "Secuencia",
        vec![step(0, "call"), step(3, "linkedin"), step(10, "call")],
    );
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    // Step 1 ran two days late; step 2 stays anchored on day 10.
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 1 },
        "linkedin",
        day(3),
    );

    cycle(&store, &MockEmailGateway::new())
        .execute(day(5))
        .await
        .unwrap();

    let enqueued = store.attempts_except(&[id]);
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].target, AttemptTarget::Step { index: 2 });
    assert_eq!(enqueued[0].channel, "call");
    assert_eq!(enqueued[0].scheduled_at, day(10));
    assert_eq!(enqueued[0].status, AttemptStatus::Pending);
}

#[tokio::test]
async fn should_continue_sequence_after_skipped_step() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "whatsapp"), step(2, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "whatsapp",
        day(0),
    );

    cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert_eq!(store.attempt(id).status, AttemptStatus::Skipped);
    let enqueued = store.attempts_except(&[id]);
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].scheduled_at, day(2));
}

#[tokio::test]
async fn should_enqueue_review_when_last_step_is_sent() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "email"), step(1, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 1 },
        "call",
        day(1),
    );
    let now = day(1) + Duration::hours(4);

    cycle(&store, &MockEmailGateway::new())
        .execute(now)
        .await
        .unwrap();

    let enqueued = store.attempts_except(&[id]);
    assert_eq!(enqueued.len(), 1, "exactly one review attempt");
    let review = &enqueued[0];
    assert_eq!(review.target, AttemptTarget::Review);
    assert_eq!(review.channel, REVIEW_CHANNEL);
    assert_eq!(review.status, AttemptStatus::Pending);
    assert_eq!(review.scheduled_at, now + Duration::days(7));
    assert_eq!(review.lead_id, lead.id);
    assert_eq!(review.sequence_id, sequence.id);
}

#[tokio::test]
async fn should_not_enqueue_review_when_last_step_is_skipped() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "whatsapp")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "whatsapp",
        day(0),
    );

    cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert!(store.attempts_except(&[id]).is_empty());
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_isolate_failure_of_one_attempt() {
    let store = MemoryStore::new();
    let sequence = test_sequence("Secuencia", vec![step(0, "call"), step(5, "call")]);
    store.add_sequence(sequence.clone());
    let leads: Vec<_> = ["Uno", "Dos", "Tres"].into_iter().map(test_lead).collect();
    let mut ids = Vec::new();
    for (i, lead) in leads.iter().enumerate() {
        store.add_lead(lead.clone());
        ids.push(store.add_attempt(
            lead.id,
            sequence.id,
            AttemptTarget::Step { index: 0 },
            "call",
            day(0) + Duration::minutes(i as i64),
        ));
    }
    store.with(|w| w.failing_task_leads.push(leads[1].id));

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(1))
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.call_tasks_created, 2);
    assert_eq!(store.attempt(ids[0]).status, AttemptStatus::Sent);
    assert_eq!(store.attempt(ids[1]).status, AttemptStatus::Failed);
    assert_eq!(store.attempt(ids[2]).status, AttemptStatus::Sent);
    assert!(
        store
            .attempt(ids[1])
            .notes
            .unwrap()
            .contains("injected task insert failure")
    );
    let (_, audited) = store.audit()[0];
    assert_eq!(audited, summary);
}

#[tokio::test]
async fn should_count_gateway_failure_as_error() {
    let store = MemoryStore::new();
    store.add_account();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "email")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "email",
        day(0),
    );
    let gateway = MockEmailGateway::failing_for("acme.corp@leads.test");

    let summary = cycle(&store, &gateway).execute(day(0)).await.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.emails_sent, 0);
    assert_eq!(store.attempt(id).status, AttemptStatus::Failed);
    assert!(store.tracked().is_empty());
}

#[tokio::test]
async fn should_fail_attempt_with_out_of_range_step() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 3 },
        "call",
        day(0),
    );

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(store.attempt(id).status, AttemptStatus::Failed);
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn should_fail_attempt_whose_next_offset_cannot_be_scheduled() {
    let store = MemoryStore::new();
    let broken_lead = test_lead("Acme Corp");
    let broken = test_sequence("Rota", vec![step(0, "call"), step(200_000_000, "call")]);
    let lead = test_lead("Globex");
    let sequence = test_sequence("Secuencia", vec![step(0, "call")]);
    for l in [&broken_lead, &lead] {
        store.add_lead((*l).clone());
    }
    store.add_sequence(broken.clone());
    store.add_sequence(sequence.clone());
    let broken_id = store.add_attempt(
        broken_lead.id,
        broken.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(0),
    );
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(1),
    );

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(2))
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.call_tasks_created, 1);
    let failed = store.attempt(broken_id);
    assert_eq!(failed.status, AttemptStatus::Failed);
    assert_eq!(
        failed.notes.as_deref(),
        Some("sequence `Rota`: step 1 offset of 200000000 days is out of range")
    );
    assert_eq!(store.attempt(id).status, AttemptStatus::Sent);
    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1, "nothing dispatched for the broken sequence");
    assert_eq!(tasks[0].task.lead_id, lead.id);
}

#[tokio::test]
async fn should_leave_attempt_for_reclaim_when_follow_up_cannot_be_enqueued() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "call"), step(3, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(0),
    );
    store.with(|w| w.fail_enqueue = true);
    let gateway = MockEmailGateway::new();

    let summary = cycle(&store, &gateway).execute(day(0)).await.unwrap();

    assert_eq!(summary.errors, 1);
    let attempt = store.attempt(id);
    assert_eq!(attempt.status, AttemptStatus::Processing);
    assert!(attempt.executed_at.is_none());
    assert!(store.attempts_except(&[id]).is_empty());
    assert!(store.lead(lead.id).last_winback_attempt.is_none());

    // Once the lease runs out the attempt is reclaimed and the sequence moves on.
    store.with(|w| w.fail_enqueue = false);
    let summary = cycle(&store, &gateway)
        .execute(day(0) + Duration::minutes(20))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(store.attempt(id).status, AttemptStatus::Sent);
    assert_eq!(store.tasks().len(), 1, "the reclaimed attempt reuses its task");
    let enqueued = store.attempts_except(&[id]);
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].target, AttemptTarget::Step { index: 1 });
    assert_eq!(enqueued[0].scheduled_at, day(3));
}

#[tokio::test]
async fn should_keep_summary_when_audit_write_fails() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(0),
    );
    store.with(|w| w.fail_audit = true);

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(0))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.call_tasks_created, 1);
}

// ── Duplicate-task guard ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_reuse_open_task_for_reclaimed_attempt() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let mut call = step(0, "call");
    call.priority = Priority::Urgent;
    let sequence = test_sequence("Secuencia", vec![call, step(4, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(0),
    );
    let gateway = MockEmailGateway::new();

    // First cycle creates the task; simulate a crash before the result was written.
    cycle(&store, &gateway).execute(day(0)).await.unwrap();
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].task.priority, Priority::Urgent);
    store.with(|w| {
        w.attempts.retain(|a| a.id == id);
        let row = &mut w.attempts[0];
        row.status = AttemptStatus::Processing;
        row.claimed_at = Some(day(0));
    });

    let summary = cycle(&store, &gateway)
        .execute(day(0) + Duration::minutes(20))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.call_tasks_created, 0);
    assert_eq!(store.tasks().len(), 1, "no duplicate task");
    let attempt = store.attempt(id);
    assert_eq!(attempt.status, AttemptStatus::Sent);
    assert_eq!(attempt.response.unwrap()["deduplicated"], true);
}

// ── Claiming ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_leave_fresh_claims_alone() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let id = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(0),
    );
    store.with(|w| {
        w.attempts[0].status = AttemptStatus::Processing;
        w.attempts[0].claimed_at = Some(day(0));
    });

    let summary = cycle(&store, &MockEmailGateway::new())
        .execute(day(0) + Duration::minutes(5))
        .await
        .unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(store.attempt(id).status, AttemptStatus::Processing);
}

#[tokio::test]
async fn should_cap_claim_at_batch_size_in_schedule_order() {
    let store = MemoryStore::new();
    let lead = test_lead("Acme Corp");
    let sequence = test_sequence("Secuencia", vec![step(0, "call")]);
    store.add_lead(lead.clone());
    store.add_sequence(sequence.clone());
    let late = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(2),
    );
    let early = store.add_attempt(
        lead.id,
        sequence.id,
        AttemptTarget::Step { index: 0 },
        "call",
        day(1),
    );
    let gateway = MockEmailGateway::new();
    let usecase = RunCycleUseCase {
        settings: mandate_winback::domain::types::WinbackSettings {
            batch_size: 1,
            ..Default::default()
        },
        ..cycle(&store, &gateway)
    };

    let summary = usecase.execute(day(3)).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(store.attempt(early).status, AttemptStatus::Sent);
    assert_eq!(store.attempt(late).status, AttemptStatus::Pending);
}
