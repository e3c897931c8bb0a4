//! End-to-end inspection runs against the mock connection provider.
//!
//! These tests drive a full Inspector (logger, dispatcher, workers) and
//! check the observational log it prints:
//! - Per-worker echo order and completion markers
//! - Global sleeps and lazy worker creation
//! - The abort sequence and what happens to commands queued after it
//! - Shutdown of every created worker

use std::sync::Arc;
use std::time::{Duration, Instant};

use lockscope_core::{
    testing::{MockCall, MockProvider, MockResponse, SharedBuffer},
    Command, Config, DatabaseConfig, DbError, DispatchConfig, Inspector, IsolationLevel,
    LogConfig, RunReport, Script, WorkerExit,
};

/// Pause between commands; long enough for a worker to finish a mock call.
const PACING: f64 = 0.03;

fn config(sleep_time: f64) -> Config {
    Config {
        database: DatabaseConfig::new("mock:"),
        dispatch: DispatchConfig {
            sleep_time,
            query_timeout: 1.0,
        },
        log: LogConfig::default(),
    }
}

fn run(provider: &MockProvider, text: &str) -> (RunReport, Vec<String>) {
    let buffer = SharedBuffer::new();
    let inspector = Inspector::new(config(PACING), Arc::new(provider.clone()));
    let script = Script::parse(text).expect("script should parse");
    let report = inspector.run(&script, Box::new(buffer.clone()));
    (report, buffer.lines())
}

/// Log lines that belong to `worker`: its echoes and its markers.
fn lines_of(lines: &[String], worker: u32) -> Vec<String> {
    let echo = format!("{}:", worker);
    let marker = format!("({}:", worker);
    lines
        .iter()
        .filter(|line| line.starts_with(&echo) || line.starts_with(&marker))
        .cloned()
        .collect()
}

#[test]
fn test_serializable_query_commit_exit() {
    let provider = MockProvider::new().on("select 1", MockResponse::rows(&["1"], &[&["1"]]));
    let (report, lines) = run(&provider, "1:SR\n1:Q:select 1\n1:C\n1:E\n");

    assert!(report.is_success());
    assert_eq!(
        lines,
        vec![
            "1:SERIALIZABLE",
            "1:QUERY:select 1",
            "(1          )",
            "(1          )",
            "(1:QUERY)",
            "1:COMMIT",
            "1:EXIT",
        ]
    );
    assert_eq!(
        provider.calls(),
        vec![
            MockCall::Connect(1),
            MockCall::SetIsolation(1, IsolationLevel::Serializable),
            MockCall::Query(1, "select 1".to_string()),
            MockCall::Commit(1),
        ]
    );
    assert_eq!(report.workers.get(&1), Some(&WorkerExit::Exited));
}

#[test]
fn test_lone_sleep_creates_no_worker() {
    let provider = MockProvider::new();
    let buffer = SharedBuffer::new();
    let inspector = Inspector::new(config(0.0), Arc::new(provider.clone()));
    let script = Script::parse("S:2\n").unwrap();

    let started = Instant::now();
    let report = inspector.run(&script, Box::new(buffer.clone()));

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(report.workers.is_empty());
    assert_eq!(report.sleeps, 1);
    assert!(provider.calls().is_empty());
    assert_eq!(buffer.lines(), vec!["SLEEP:2", "(SLEEP)"]);
}

#[test]
fn test_update_reports_zero_count() {
    let sql = "update t set x=1 where id=999";
    let provider = MockProvider::new().on(sql, MockResponse::Count(0));
    let (report, lines) = run(&provider, &format!("1:U:{}\n1:C\n1:E\n", sql));

    assert!(report.is_success());
    assert_eq!(
        lines,
        vec![
            format!("1:UPDATE:{}", sql),
            "(1:UPDATE:COUNT=0)".to_string(),
            "1:COMMIT".to_string(),
            "1:EXIT".to_string(),
        ]
    );
}

#[test]
fn test_failing_query_aborts_worker_and_drops_later_commands() {
    let provider = MockProvider::new().on(
        "select x / 0 from t",
        MockResponse::FailAfterRows {
            columns: vec!["x".to_string()],
            rows: vec![vec!["10".to_string()]],
            error: DbError::Statement("division by zero".to_string()),
        },
    );
    let (report, lines) = run(&provider, "1:RC\n2:Q:select x / 0 from t\n2:C\n1:C\n");

    assert!(report.is_success());
    assert_eq!(
        lines_of(&lines, 2),
        vec![
            "2:QUERY:select x / 0 from t",
            "(2:QUERY)",
            "(2:SQL error: division by zero)",
            "2:ABORT",
        ]
    );
    assert!(!lines.contains(&"2:COMMIT".to_string()));
    assert!(!provider.calls().contains(&MockCall::Commit(2)));

    // Worker 1 is unaffected
    assert_eq!(lines_of(&lines, 1), vec!["1:READ_COMMITTED", "1:COMMIT", "1:EXIT"]);
    assert_eq!(report.aborted_workers(), vec![2]);
    assert_eq!(report.workers.get(&1), Some(&WorkerExit::Exited));
}

#[test]
fn test_connect_failure_is_local_to_one_worker() {
    let provider = MockProvider::new().fail_connect(2);
    let (report, lines) = run(&provider, "1:RR\n2:RR\n1:C\n2:C\n");

    let worker2 = lines_of(&lines, 2);
    assert_eq!(worker2.len(), 2);
    assert!(worker2[0].starts_with("(2:connection failed"));
    assert_eq!(worker2[1], "2:ABORT");

    assert_eq!(lines_of(&lines, 1), vec!["1:REPEATABLE_READ", "1:COMMIT", "1:EXIT"]);
    assert_eq!(report.workers.get(&2), Some(&WorkerExit::Aborted));
    assert!(report.is_success());
}

#[test]
fn test_workers_created_match_referenced_ids() {
    let text = "3:RC\nS:0\n7:Q:select 1\n3:C\n1:U:update t set x = 2\n7:R\n1:C\n";
    let provider = MockProvider::new();
    let (report, _) = run(&provider, text);

    let script = Script::parse(text).unwrap();
    let created: Vec<_> = report.workers.keys().copied().collect();
    let referenced: Vec<_> = script.worker_ids().into_iter().collect();
    assert_eq!(created, referenced);
    assert!(report.workers.values().all(|exit| *exit == WorkerExit::Exited));
}

#[test]
fn test_each_worker_echoes_its_commands_in_script_order() {
    let text = "1:RC\n2:SR\n1:Q:select a\n2:U:update b set c = 1\n1:R\n2:C\n1:E\n2:E\n";
    let provider = MockProvider::new();
    let (_, lines) = run(&provider, text);

    let script = Script::parse(text).unwrap();
    for worker in [1, 2] {
        let expected: Vec<String> = script
            .commands()
            .iter()
            .filter(|command| command.worker() == Some(worker))
            .map(Command::to_string)
            .collect();
        let echoed: Vec<String> = lines_of(&lines, worker)
            .into_iter()
            .filter(|line| !line.starts_with('('))
            .collect();
        assert_eq!(echoed, expected, "worker {}", worker);
    }
}

#[test]
fn test_loading_twice_is_identical() {
    let text = "# setup\n1:SR\n1:Q:select 'a:b' from t\n\nS:1\n1:E\n";
    let first = Script::parse(text).unwrap();
    let second = Script::parse(text).unwrap();
    assert_eq!(first.commands(), second.commands());
}

#[test]
fn test_echoed_lines_reparse_to_the_same_commands() {
    let text = "1:SR\n\
                1:Q:select a, b from t where c = 'x:y'\n\
                2:U:update t set a = 1\n\
                S:0\n\
                2:R\n\
                1:C\n";
    let provider = MockProvider::new();
    let (_, lines) = run(&provider, text);

    let echoed: String = lines
        .iter()
        .filter(|line| !line.starts_with('('))
        .filter(|line| !line.ends_with(":EXIT"))
        .map(|line| format!("{}\n", line))
        .collect();
    let reparsed = Script::parse(&echoed).unwrap();

    let mut expected = Script::parse(text).unwrap().commands().to_vec();
    let mut actual = reparsed.commands().to_vec();
    // Cross-worker interleaving may differ; compare as multisets
    expected.sort_by_key(|c| c.to_string());
    actual.sort_by_key(|c| c.to_string());
    assert_eq!(actual, expected);
}

#[test]
fn test_interrupted_run_still_joins_every_worker() {
    let provider = MockProvider::new();
    let buffer = SharedBuffer::new();
    let inspector = Inspector::new(config(30.0), Arc::new(provider.clone()));
    let interrupt = inspector.interrupt();
    let trigger = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        interrupt.trigger();
    });

    let script = Script::parse("4:RC\n5:RC\n").unwrap();
    let report = inspector.run(&script, Box::new(buffer.clone()));
    trigger.join().unwrap();

    assert!(!report.is_success());
    assert_eq!(report.workers.len(), 1);
    assert_eq!(report.workers.get(&4), Some(&WorkerExit::Exited));
    assert_eq!(buffer.lines(), vec!["4:READ_COMMITTED", "4:EXIT"]);
    assert_eq!(report.lines_logged, 2);
}
