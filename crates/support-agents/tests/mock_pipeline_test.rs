//! Offline runs through the CLI wiring: canned completions, on-disk
//! knowledge, CSV escalation log and JSONL telemetry.

use std::sync::Arc;

use support_agents::agents::canned::{CANNED_DRAFT, CANNED_RETRY_DRAFT};
use support_agents::agents::CannedCompletion;
use support_agents::config::AgentConfig;
use support_agents::runner::{build_engine, format_result, run_batch, run_ticket};
use support_agents::telemetry::{read_run_summaries, TelemetryLog, TelemetryStats};
use triage_coordination::escalation::CSV_HEADER;
use triage_coordination::{
    Category, CsvEscalationSink, DirectoryKnowledgeBase, EscalationRecord, PromptKind, Ticket,
    WorkflowEngine, ESCALATION_NOTICE,
};

fn mock_config(dir: &std::path::Path) -> AgentConfig {
    let mut config = AgentConfig::from_toml_str("").unwrap();
    config.knowledge_dir = dir.join("knowledge");
    config.escalation_log = dir.join("logs/escalation_log.csv");
    config.telemetry_log = Some(dir.join("logs/telemetry.jsonl"));
    config
}

fn ticket() -> Ticket {
    Ticket::new(
        "I was charged twice",
        "Hi, I noticed two charges on my credit card for this month's billing.",
    )
    .unwrap()
}

#[tokio::test]
async fn test_mock_run_approves_first_draft() {
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(dir.path());
    let engine = build_engine(&config, true).unwrap();

    let telemetry = TelemetryLog::new(config.telemetry_log.as_deref().unwrap());
    let result = run_ticket(&engine, ticket(), Some(&telemetry))
        .await
        .unwrap();

    assert!(result.approved);
    assert_eq!(result.category, Category::Billing);
    assert_eq!(result.output, CANNED_DRAFT);
    assert!(format_result(&result).starts_with("**Category**: Billing\n\n**Output**:\nDear Customer"));
    assert!(!config.escalation_log.exists());

    let summaries = read_run_summaries(config.telemetry_log.as_deref().unwrap()).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].drafts, 1);
    assert!(!summaries[0].escalated);
}

#[tokio::test]
async fn test_mock_run_reads_knowledge_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(dir.path());
    std::fs::create_dir_all(&config.knowledge_dir).unwrap();
    std::fs::write(
        config.knowledge_dir.join("billing.txt"),
        "Refunds for duplicate charges take 5-7 business days.",
    )
    .unwrap();

    let engine = build_engine(&config, true).unwrap();
    let run = engine.run_traced(ticket()).await.unwrap();
    assert_eq!(
        run.state.context(),
        Some("Refunds for duplicate charges take 5-7 business days.")
    );
}

#[tokio::test]
async fn test_batch_escalations_land_in_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("escalation_log.csv");
    let telemetry = dir.path().join("telemetry.jsonl");

    let completion = CannedCompletion::new()
        .with_response(PromptKind::Review, "Escalate\nFeedback: Too vague");
    let engine = WorkflowEngine::new(
        Arc::new(completion),
        Arc::new(DirectoryKnowledgeBase::new(dir.path().join("missing"))),
        Arc::new(CsvEscalationSink::new(&csv_path)),
    );

    let input = "\
{\"subject\":\"Charged twice\",\"description\":\"Two charges\"}
{\"subject\":\"\",\"description\":\"No subject\"}
{\"subject\":\"Refund status\",\"description\":\"Where is my refund?\"}
{\"subject\":\"Invoice copy\",\"description\":\"Please resend the invoice\"}
";

    let log = Arc::new(TelemetryLog::new(&telemetry));
    let outcomes = run_batch(&engine, input, 2, Some(log)).await;

    assert_eq!(
        outcomes.iter().map(|o| o.line).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert!(outcomes[1].error.is_some());
    for outcome in [&outcomes[0], &outcomes[2], &outcomes[3]] {
        let result = outcome.result.as_ref().unwrap();
        assert!(!result.approved);
        assert_eq!(result.output, ESCALATION_NOTICE);
        assert_eq!(result.feedback.as_deref(), Some("Too vague"));
    }

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        CSV_HEADER
    );
    let rows: Vec<EscalationRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.draft == CANNED_RETRY_DRAFT));
    assert!(rows
        .iter()
        .all(|r| r.reason == "Draft rejected after 3 attempts. Feedback: Too vague"));

    let stats = TelemetryStats::from_summaries(&read_run_summaries(&telemetry).unwrap());
    assert_eq!(stats.runs, 3);
    assert_eq!(stats.escalated, 3);
    assert_eq!(stats.approved, 0);
    assert!((stats.average_drafts - 3.0).abs() < f64::EPSILON);
}
