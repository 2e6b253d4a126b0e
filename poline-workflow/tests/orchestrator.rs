//! Orchestrator behaviour against a scripted, recording API.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use poline_core::types::{
    AccountSegments, LineNumber, LineRequest, PoId, PoRecord, RemoteLineId, Segment1,
};
use poline_core::PartialBatchPolicy;
use poline_renderer::BodyRenderer;
use poline_workflow::{
    ApiResponse, AuditLog, Orchestrator, PoOutcome, PoStage, ProcurementApi, RunSummary,
    WorkflowError,
};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Fake API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Get(u64),
    Reopen(String),
    Batch(u64),
    Close(u64, String),
}

#[derive(Default)]
struct FakeApi {
    /// GET bodies by PO; absent POs fail at the transport level.
    pos: HashMap<u64, ApiResponse>,
    batch_responses: HashMap<u64, ApiResponse>,
    failing_reopens: HashSet<String>,
    /// Reopens and batches that never get an HTTP response.
    unreachable_reopens: HashSet<String>,
    unreachable_batches: HashSet<u64>,
    failing_closes: HashSet<String>,
    calls: RefCell<Vec<Call>>,
    batch_bodies: RefCell<Vec<String>>,
}

impl FakeApi {
    fn with_po(mut self, po: u64, lines: &[(&str, u32, &str)]) -> Self {
        let lines: Vec<String> = lines
            .iter()
            .map(|(id, num, status)| {
                format!(r#"{{"id":{id},"line-num":"{num}","status":"{status}"}}"#)
            })
            .collect();
        let body = format!(r#"{{"id":{po},"order-lines":[{}]}}"#, lines.join(","));
        self.pos.insert(po, ApiResponse::new(200, body));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

fn element<'a>(xml: &'a str, name: &str) -> &'a str {
    let open = format!("<{name}>");
    let start = xml.find(&open).expect("element present") + open.len();
    let end = start + xml[start..].find('<').expect("closing tag");
    &xml[start..end]
}

impl ProcurementApi for FakeApi {
    fn get_purchase_order(&self, po_id: PoId) -> Result<ApiResponse, WorkflowError> {
        self.calls.borrow_mut().push(Call::Get(po_id.0));
        self.pos
            .get(&po_id.0)
            .cloned()
            .ok_or_else(|| WorkflowError::Transport {
                url: format!("/api/purchase_orders/{po_id}"),
                message: "connection refused".to_string(),
            })
    }

    fn reopen_line(&self, line_id: &RemoteLineId, body: &str) -> Result<ApiResponse, WorkflowError> {
        assert_eq!(body, r#"{"reason-insight-code":"API"}"#);
        self.calls.borrow_mut().push(Call::Reopen(line_id.0.clone()));
        if self.unreachable_reopens.contains(&line_id.0) {
            return Err(WorkflowError::Transport {
                url: format!("/api/purchase_order_lines/{line_id}/reopen_for_receiving"),
                message: "timed out".to_string(),
            });
        }
        if self.failing_reopens.contains(&line_id.0) {
            Ok(ApiResponse::new(403, "<errors><error>Not allowed</error></errors>"))
        } else {
            Ok(ApiResponse::new(200, "{}"))
        }
    }

    fn put_purchase_order(&self, po_id: PoId, xml: &str) -> Result<ApiResponse, WorkflowError> {
        if xml.contains("<account>") {
            self.calls.borrow_mut().push(Call::Batch(po_id.0));
            self.batch_bodies.borrow_mut().push(xml.to_string());
            if self.unreachable_batches.contains(&po_id.0) {
                return Err(WorkflowError::Transport {
                    url: format!("/api/purchase_orders/{po_id}"),
                    message: "connection reset".to_string(),
                });
            }
            return Ok(self
                .batch_responses
                .get(&po_id.0)
                .cloned()
                .unwrap_or_else(|| ApiResponse::new(200, "")));
        }
        assert_eq!(element(xml, "status"), "soft_closed_for_invoicing");
        let id = element(xml, "id").to_string();
        self.calls.borrow_mut().push(Call::Close(po_id.0, id.clone()));
        if self.failing_closes.contains(&id) {
            Ok(ApiResponse::new(500, "boom"))
        } else {
            Ok(ApiResponse::new(200, ""))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request(line: u32) -> LineRequest {
    LineRequest {
        line_number: LineNumber(line),
        account_code: format!("AC-{line}"),
        chart_of_accounts: "Corporate".to_string(),
        segments: AccountSegments {
            segment_1: Segment1(line),
            segment_2: "A".to_string(),
            segment_3: "B".to_string(),
            segment_4: "C".to_string(),
            segment_5: "D".to_string(),
        },
    }
}

fn record(po: u64, lines: &[u32]) -> PoRecord {
    PoRecord {
        po_id: PoId(po),
        lines: lines.iter().copied().map(request).collect(),
    }
}

/// Run every record and return the summary plus audit data rows as fields.
fn run(
    api: &FakeApi,
    records: &[PoRecord],
    policy: PartialBatchPolicy,
) -> (RunSummary, Vec<Vec<String>>) {
    let renderer = BodyRenderer::new().expect("renderer");
    let mut audit = AuditLog::new(Vec::new(), true).expect("audit");
    let summary = Orchestrator::new(api, &renderer, &mut audit, policy)
        .run(records, |_| {})
        .expect("run");
    let bytes = audit.into_inner().expect("flush");
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let rows = reader
        .records()
        .map(|r| r.expect("row").iter().map(str::to_string).collect::<Vec<_>>())
        .collect();
    (summary, rows)
}

fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn open_and_soft_closed_pos_round_trip() {
    let api = FakeApi::default()
        .with_po(100, &[("5001", 1, "issued")])
        .with_po(200, &[("6001", 1, "soft_closed_for_invoicing")]);

    let (summary, rows) = run(
        &api,
        &[record(100, &[1]), record(200, &[1])],
        PartialBatchPolicy::Skip,
    );

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Batch(100),
            Call::Close(100, "5001".into()),
            Call::Get(200),
            Call::Reopen("6001".into()),
            Call::Batch(200),
            Call::Close(200, "6001".into()),
        ]
    );
    assert_eq!(summary.updated(), 2);
    assert_eq!(summary.lines_closed(), 2);
    assert_eq!(
        rows,
        vec![
            row(&["100", "1", "N/A", "SUCCESS", "Lines updated successfully"]),
            row(&["100", "N/A", "5001", "SUCCESS", "Line closed successfully"]),
            row(&["200", "1", "N/A", "SUCCESS", "Lines updated successfully"]),
            row(&["200", "N/A", "6001", "SUCCESS", "Line closed successfully"]),
        ]
    );
    assert!(summary.reports.iter().all(|r| r.stage == PoStage::Done));
}

#[test]
fn batch_carries_every_line_in_input_order() {
    let api = FakeApi::default().with_po(
        100,
        &[("13", 3, "issued"), ("11", 1, "issued"), ("12", 2, "issued")],
    );
    run(&api, &[record(100, &[2, 3, 1])], PartialBatchPolicy::Skip);

    let bodies = api.batch_bodies.borrow();
    assert_eq!(bodies.len(), 1, "exactly one batched update per PO");
    let xml = &bodies[0];
    let pos: Vec<usize> = ["<id>12</id>", "<id>13</id>", "<id>11</id>"]
        .iter()
        .map(|id| xml.find(*id).expect("line in batch"))
        .collect();
    assert!(pos[0] < pos[1] && pos[1] < pos[2]);
    assert!(xml.contains("<segment-1>02</segment-1>"));
}

// ---------------------------------------------------------------------------
// Rejected update still closes
// ---------------------------------------------------------------------------

#[test]
fn rejected_batch_still_closes_every_line() {
    let mut api = FakeApi::default().with_po(
        300,
        &[("71", 1, "soft_closed_for_invoicing"), ("72", 2, "issued")],
    );
    api.batch_responses.insert(
        300,
        ApiResponse::new(
            422,
            "<?xml version=\"1.0\"?>\n<errors>\n  <error>Account code is invalid</error>\n</errors>",
        ),
    );

    let (summary, rows) = run(&api, &[record(300, &[1, 2])], PartialBatchPolicy::Skip);

    assert_eq!(
        summary.reports[0].outcome,
        PoOutcome::Rejected {
            lines: 2,
            excerpt: "Account code is invalid".to_string()
        }
    );
    let closes: Vec<Call> = api
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Close(..)))
        .collect();
    assert_eq!(
        closes,
        vec![Call::Close(300, "71".into()), Call::Close(300, "72".into())]
    );
    assert_eq!(
        rows[0],
        row(&["300", "2", "N/A", "FAILURE", "Account code is invalid"])
    );
    assert_eq!(rows.len(), 3);
}

// ---------------------------------------------------------------------------
// Ordering and isolation
// ---------------------------------------------------------------------------

#[test]
fn reopen_precedes_batch_and_close_follows() {
    let api = FakeApi::default().with_po(
        100,
        &[("1", 1, "soft_closed_for_invoicing"), ("2", 2, "soft_closed_for_invoicing")],
    );
    run(&api, &[record(100, &[1, 2])], PartialBatchPolicy::Skip);

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Reopen("1".into()),
            Call::Reopen("2".into()),
            Call::Batch(100),
            Call::Close(100, "1".into()),
            Call::Close(100, "2".into()),
        ]
    );
}

#[test]
fn po_without_lines_makes_no_requests() {
    let api = FakeApi::default();
    let (summary, rows) = run(&api, &[record(400, &[])], PartialBatchPolicy::Skip);

    assert!(api.calls().is_empty());
    assert_eq!(summary.reports[0].outcome, PoOutcome::NothingToUpdate);
    assert_eq!(rows, vec![row(&["400", "0", "N/A", "SUCCESS", "No lines to update"])]);
}

#[rstest]
#[case::transport(None)]
#[case::not_found(Some(ApiResponse::new(404, "Not Found")))]
#[case::bad_json(Some(ApiResponse::new(200, "<html>")))]
fn fetch_failure_is_isolated_to_its_po(#[case] first: Option<ApiResponse>) {
    let mut api = FakeApi::default().with_po(2, &[("21", 1, "issued")]);
    if let Some(response) = first {
        api.pos.insert(1, response);
    }

    let (summary, rows) = run(
        &api,
        &[record(1, &[1]), record(2, &[1])],
        PartialBatchPolicy::Skip,
    );

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(1),
            Call::Get(2),
            Call::Batch(2),
            Call::Close(2, "21".into()),
        ]
    );
    assert!(matches!(
        summary.reports[0].outcome,
        PoOutcome::FetchFailed { .. }
    ));
    assert_eq!(summary.reports[0].stage, PoStage::Fetched);
    assert_eq!(rows[0][..4], row(&["1", "N/A", "N/A", "FAILURE"])[..]);
    assert!(rows[0][4].starts_with("PO data not loaded"));
    assert!(summary.reports[1].outcome.is_success());
}

#[test]
fn close_failure_does_not_stop_remaining_closes() {
    let mut api = FakeApi::default().with_po(
        100,
        &[("1", 1, "issued"), ("2", 2, "issued"), ("3", 3, "issued")],
    );
    api.failing_closes.insert("2".to_string());

    let (summary, rows) = run(&api, &[record(100, &[1, 2, 3])], PartialBatchPolicy::Skip);

    assert_eq!(summary.lines_closed(), 2);
    assert_eq!(summary.close_failures(), 1);
    let close_rows: Vec<&Vec<String>> = rows.iter().filter(|r| r[2] != "N/A").collect();
    assert_eq!(close_rows.len(), 3);
    assert_eq!(close_rows[1][3], "FAILURE");
    assert!(close_rows[1][4].contains("HTTP 500"));
    assert_eq!(close_rows[2][3], "SUCCESS");
}

// ---------------------------------------------------------------------------
// Unresolved lines
// ---------------------------------------------------------------------------

#[test]
fn skip_policy_leaves_po_untouched() {
    let api = FakeApi::default().with_po(100, &[("1", 1, "soft_closed_for_invoicing")]);
    let (summary, rows) = run(&api, &[record(100, &[1, 9])], PartialBatchPolicy::Skip);

    assert_eq!(api.calls(), vec![Call::Get(100)], "no mutation at all");
    assert_eq!(summary.reports[0].unresolved, Some(LineNumber(9)));
    assert!(matches!(summary.reports[0].outcome, PoOutcome::Skipped { .. }));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "2");
    assert_eq!(rows[0][3], "FAILURE");
    assert!(rows[0][4].contains("Line number 9"));
}

#[test]
fn ambiguous_line_is_unresolved() {
    let api = FakeApi::default().with_po(100, &[("1", 1, "issued"), ("2", 1, "issued")]);
    let (summary, rows) = run(&api, &[record(100, &[1])], PartialBatchPolicy::Skip);

    assert_eq!(api.calls(), vec![Call::Get(100)]);
    assert_eq!(summary.reports[0].unresolved, Some(LineNumber(1)));
    assert!(rows[0][4].contains("matches 2 remote lines"));
}

#[test]
fn submit_resolved_processes_lines_before_the_gap() {
    let api = FakeApi::default().with_po(
        100,
        &[("1", 1, "issued"), ("3", 3, "issued")],
    );
    let (summary, rows) = run(
        &api,
        &[record(100, &[1, 2, 3])],
        PartialBatchPolicy::SubmitResolved,
    );

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Batch(100),
            Call::Close(100, "1".into()),
        ]
    );
    assert_eq!(summary.reports[0].outcome, PoOutcome::Updated { lines: 1 });
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][3], "FAILURE");
    assert!(rows[0][4].starts_with("Line number 2"));
    assert_eq!(rows[1], row(&["100", "1", "N/A", "SUCCESS", "Lines updated successfully"]));
}

// ---------------------------------------------------------------------------
// Reopen failures
// ---------------------------------------------------------------------------

#[test]
fn failed_reopen_drops_line_from_batch_but_still_closes_it() {
    let mut api = FakeApi::default().with_po(
        100,
        &[("1", 1, "soft_closed_for_invoicing"), ("2", 2, "issued")],
    );
    api.failing_reopens.insert("1".to_string());

    let (summary, rows) = run(&api, &[record(100, &[1, 2])], PartialBatchPolicy::Skip);

    let report = &summary.reports[0];
    assert_eq!(report.reopen_failures, vec![RemoteLineId::from("1")]);
    assert_eq!(report.outcome, PoOutcome::Updated { lines: 1 });
    let bodies = api.batch_bodies.borrow();
    let batch = &bodies[0];
    assert!(!batch.contains("<id>1</id>"));
    assert!(batch.contains("<id>2</id>"));
    assert_eq!(report.closes.len(), 2);

    assert_eq!(rows[0][2], "1");
    assert!(rows[0][4].contains("Not allowed"));
}

#[test]
fn every_reopen_failing_sends_no_batch() {
    let mut api = FakeApi::default().with_po(100, &[("1", 1, "soft_closed_for_invoicing")]);
    api.failing_reopens.insert("1".to_string());

    let (summary, _) = run(&api, &[record(100, &[1])], PartialBatchPolicy::Skip);

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Reopen("1".into()),
            Call::Close(100, "1".into()),
        ]
    );
    assert_eq!(summary.reports[0].outcome, PoOutcome::NothingToUpdate);
    assert_eq!(summary.failed(), 1);
}

#[test]
fn unreachable_reopen_is_logged_and_line_still_closed() {
    let mut api = FakeApi::default().with_po(100, &[("1", 1, "soft_closed_for_invoicing")]);
    api.unreachable_reopens.insert("1".to_string());

    let (summary, rows) = run(&api, &[record(100, &[1])], PartialBatchPolicy::Skip);

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Reopen("1".into()),
            Call::Close(100, "1".into()),
        ]
    );
    assert_eq!(summary.reports[0].reopen_failures, vec![RemoteLineId::from("1")]);
    assert_eq!(rows[0][2], "1");
    assert_eq!(rows[0][3], "FAILURE");
    assert!(rows[0][4].contains("timed out"));
}

// ---------------------------------------------------------------------------
// Batch transport failure
// ---------------------------------------------------------------------------

#[test]
fn unreachable_batch_is_a_failure_and_lines_still_close() {
    let mut api = FakeApi::default().with_po(
        500,
        &[("51", 1, "soft_closed_for_invoicing"), ("52", 2, "issued")],
    );
    api.unreachable_batches.insert(500);

    let (summary, rows) = run(&api, &[record(500, &[1, 2])], PartialBatchPolicy::Skip);

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(500),
            Call::Reopen("51".into()),
            Call::Batch(500),
            Call::Close(500, "51".into()),
            Call::Close(500, "52".into()),
        ]
    );
    match &summary.reports[0].outcome {
        PoOutcome::Rejected { lines, excerpt } => {
            assert_eq!(*lines, 2);
            assert!(excerpt.contains("connection reset"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(rows[0][..4], row(&["500", "2", "N/A", "FAILURE"])[..]);
    assert!(rows[0][4].contains("connection reset"));
    assert_eq!(rows.len(), 3);
    assert_eq!(summary.lines_closed(), 2);
}

// ---------------------------------------------------------------------------
// Repeated line numbers
// ---------------------------------------------------------------------------

#[test]
fn repeated_line_number_skips_po() {
    let api = FakeApi::default().with_po(100, &[("1", 1, "issued"), ("2", 2, "issued")]);
    let (summary, rows) = run(&api, &[record(100, &[1, 2, 1])], PartialBatchPolicy::Skip);

    assert_eq!(api.calls(), vec![Call::Get(100)]);
    assert_eq!(summary.reports[0].unresolved, Some(LineNumber(1)));
    assert!(matches!(summary.reports[0].outcome, PoOutcome::Skipped { .. }));
    assert_eq!(rows.len(), 1);
    assert!(rows[0][4].contains("repeated in input"));
}

#[test]
fn repeated_line_number_is_sent_once_under_submit_resolved() {
    let api = FakeApi::default().with_po(100, &[("1", 1, "issued"), ("2", 2, "issued")]);
    let (summary, rows) = run(
        &api,
        &[record(100, &[1, 2, 1])],
        PartialBatchPolicy::SubmitResolved,
    );

    assert_eq!(
        api.calls(),
        vec![
            Call::Get(100),
            Call::Batch(100),
            Call::Close(100, "1".into()),
            Call::Close(100, "2".into()),
        ]
    );
    let bodies = api.batch_bodies.borrow();
    assert_eq!(bodies[0].matches("<id>1</id>").count(), 1);
    assert_eq!(summary.reports[0].outcome, PoOutcome::Updated { lines: 2 });
    assert!(rows[0][4].contains("repeated in input"));
}

// ---------------------------------------------------------------------------
// Audit log failures
// ---------------------------------------------------------------------------

/// Accepts the header write, then fails every later write.
#[derive(Default)]
struct FailsAfterHeader {
    writes: usize,
}

impl Write for FailsAfterHeader {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        if self.writes == 1 {
            Ok(buf.len())
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
#[case::after_accepted_batch(
    false,
    vec![Call::Get(100), Call::Reopen("1".into()), Call::Batch(100), Call::Close(100, "1".into())]
)]
#[case::after_failed_reopen(
    true,
    vec![Call::Get(100), Call::Reopen("1".into()), Call::Close(100, "1".into())]
)]
fn audit_failure_still_closes_reopened_lines(
    #[case] reopen_fails: bool,
    #[case] expected: Vec<Call>,
) {
    let mut api = FakeApi::default().with_po(100, &[("1", 1, "soft_closed_for_invoicing")]);
    if reopen_fails {
        api.failing_reopens.insert("1".to_string());
    }
    let renderer = BodyRenderer::new().expect("renderer");
    let mut audit = AuditLog::new(FailsAfterHeader::default(), true).expect("header written");

    let result = Orchestrator::new(&api, &renderer, &mut audit, PartialBatchPolicy::Skip)
        .process_po(&record(100, &[1]));

    assert!(matches!(result, Err(WorkflowError::Audit(_))));
    assert_eq!(api.calls(), expected);
}
