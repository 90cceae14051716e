use super::{run_pass, PassSummary};
use crate::config::{PassConfig, PollSettings};
use crate::platform::fake::{run, state, workspace, Call, FakePlatform};
use crate::platform::{PlanCounts, RunStatus};
use crate::poll::FakeClock;
use std::fs;
use std::path::Path;

fn pass_config(review_log: &Path, auto_apply: bool) -> PassConfig {
    PassConfig {
        organization: "example_org".to_string(),
        name_pattern: Some("^svc-".to_string()),
        tag: None,
        auto_apply,
        review_log: review_log.to_path_buf(),
        poll: PollSettings::default(),
    }
}

fn script_plan(platform: &FakePlatform, workspace_id: &str, counts: PlanCounts) {
    let run_id = format!("run-{workspace_id}");
    let plan_id = format!("plan-{workspace_id}");
    platform.on_create(workspace_id, &run_id);
    platform.push_run_state(&run_id, state(RunStatus::Planning, None));
    platform.push_run_state(&run_id, state(RunStatus::Planned, Some(plan_id.as_str())));
    platform.push_plan(&plan_id, counts);
}

#[test]
fn mixed_fleet_reaches_expected_dispositions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("review_links.csv");
    fs::write(&log_path, "old,row,from,last,run\r\n").expect("seed log");

    let platform = FakePlatform::new();
    platform.add_page(vec![
        workspace("ws-1", "svc-add", &[]),
        workspace("ws-2", "svc-modify", &[]),
        workspace("ws-x", "unrelated", &[]),
    ]);
    platform.add_page(vec![workspace("ws-3", "svc-quiet", &[])]);
    platform.push_runs("ws-1", vec![run("run-stale", RunStatus::Pending)]);
    platform.push_runs("ws-1", vec![run("run-stale", RunStatus::Discarded)]);
    script_plan(&platform, "ws-1", PlanCounts::ready(3, 0, 0));
    script_plan(&platform, "ws-2", PlanCounts::ready(0, 2, 1));
    script_plan(&platform, "ws-3", PlanCounts::ready(0, 0, 0));

    let clock = FakeClock::new();
    let summary = run_pass(&platform, &clock, &pass_config(&log_path, true)).expect("pass");

    assert_eq!(
        summary,
        PassSummary {
            workspaces: 3,
            applied: 1,
            reviewed: 1,
            no_op: 1,
            ..PassSummary::default()
        }
    );
    assert_eq!(platform.discarded(), vec!["run-stale"]);
    assert_eq!(platform.applied(), vec!["run-ws-1"]);
    assert_eq!(platform.created(), vec!["ws-1", "ws-2", "ws-3"]);

    let text = fs::read_to_string(&log_path).expect("read log");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "workspace_id,run_id,run_url,summary",
            "ws-2,run-ws-2,https://ui.test/app/ws-2/runs/run-ws-2,+0 ~2 -1",
        ]
    );
}

#[test]
fn workspaces_are_processed_sequentially() {
    let dir = tempfile::tempdir().expect("tempdir");
    let platform = FakePlatform::new();
    platform.add_page(vec![
        workspace("ws-a", "svc-a", &[]),
        workspace("ws-b", "svc-b", &[]),
    ]);
    script_plan(&platform, "ws-a", PlanCounts::ready(0, 0, 0));
    script_plan(&platform, "ws-b", PlanCounts::ready(0, 0, 0));

    let clock = FakeClock::new();
    run_pass(
        &platform,
        &clock,
        &pass_config(&dir.path().join("r.csv"), false),
    )
    .expect("pass");

    let calls = platform.calls();
    let last_a = calls
        .iter()
        .rposition(|call| matches!(call, Call::GetPlan(id) if id == "plan-ws-a"))
        .expect("ws-a plan read");
    let first_b = calls
        .iter()
        .position(|call| matches!(call, Call::ListRuns(id) if id == "ws-b"))
        .expect("ws-b listing");
    assert!(last_a < first_b, "ws-b started before ws-a finished");
}

#[test]
fn failing_workspace_does_not_block_the_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let platform = FakePlatform::new();
    platform.add_page(vec![
        workspace("ws-bad", "svc-bad", &[]),
        workspace("ws-busy", "svc-busy", &[]),
        workspace("ws-ok", "svc-ok", &[]),
    ]);
    platform.fail_runs("ws-bad", "internal error");
    platform.push_runs("ws-busy", vec![run("run-live", RunStatus::Applying)]);
    script_plan(&platform, "ws-ok", PlanCounts::ready(2, 0, 0));

    let clock = FakeClock::new();
    let summary = run_pass(
        &platform,
        &clock,
        &pass_config(&dir.path().join("r.csv"), false),
    )
    .expect("pass");

    assert_eq!(summary.workspaces, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.busy, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(platform.created(), vec!["ws-ok"]);
    assert!(platform.applied().is_empty());
}

#[test]
fn invalid_pattern_fails_before_any_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let platform = FakePlatform::new();
    let mut config = pass_config(&dir.path().join("r.csv"), false);
    config.name_pattern = Some("[".to_string());

    let clock = FakeClock::new();
    assert!(run_pass(&platform, &clock, &config).is_err());
    assert!(platform.calls().is_empty());
}

#[test]
fn review_log_is_reset_even_when_nothing_matches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("review.csv");
    fs::write(&log_path, "leftover\r\n").expect("seed log");
    let platform = FakePlatform::new();

    let clock = FakeClock::new();
    let summary = run_pass(&platform, &clock, &pass_config(&log_path, true)).expect("pass");
    assert_eq!(summary, PassSummary::default());
    assert_eq!(
        fs::read_to_string(&log_path).expect("read log"),
        "workspace_id,run_id,run_url,summary\r\n"
    );
}

#[test]
fn workspace_listed_on_two_pages_gets_one_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("review.csv");
    let platform = FakePlatform::new();
    platform.add_page(vec![workspace("ws-1", "svc-shifted", &[])]);
    platform.add_page(vec![workspace("ws-1", "svc-shifted", &[])]);
    script_plan(&platform, "ws-1", PlanCounts::ready(0, 1, 0));

    let clock = FakeClock::new();
    let summary = run_pass(&platform, &clock, &pass_config(&log_path, true)).expect("pass");

    assert_eq!(
        summary,
        PassSummary {
            workspaces: 1,
            reviewed: 1,
            ..PassSummary::default()
        }
    );
    assert_eq!(platform.created(), vec!["ws-1"]);
    assert!(platform.discarded().is_empty());
    let text = fs::read_to_string(&log_path).expect("read log");
    assert_eq!(text.lines().count(), 2, "log: {text}");
}
