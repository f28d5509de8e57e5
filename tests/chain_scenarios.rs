#![cfg(unix)]

use std::fs::{self, File};
use std::io::{Read, Write};

use pipechain::errors::{PipechainError, ProcessError};
use pipechain::process::{cancel_pair, Input, OsProcess, Output, Process};
use pipechain::types::{ChainOptions, LaunchFailure, StageState};
use pipechain::Chain;
use pipechain_test_utils::{init_tracing, with_timeout};

const NO_ARGS: [&str; 0] = [];

#[tokio::test]
async fn echo_into_grep_yields_the_matching_line() {
    init_tracing();
    let mut chain = Chain::command("echo", ["hello world"]).pipe("grep", ["world"]);

    let out = with_timeout(chain.combined_output()).await.unwrap();

    assert_eq!(out, b"hello world\n");
    with_timeout(chain.wait()).await.unwrap();
}

#[tokio::test]
async fn identical_chains_produce_identical_output() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut chain = Chain::command("printf", ["b\\na\\nc\\n"]).pipe("sort", NO_ARGS);
        runs.push(with_timeout(chain.output()).await.unwrap());
        with_timeout(chain.wait()).await.unwrap();
    }
    assert_eq!(runs[0], b"a\nb\nc\n");
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn failing_single_stage_is_reported_by_wait() {
    let mut chain = Chain::command("false", NO_ARGS);

    with_timeout(chain.start()).await.unwrap();
    let err = with_timeout(chain.wait()).await.unwrap_err();

    match &err {
        PipechainError::Wait {
            index,
            name,
            source: ProcessError::Exit(status),
        } => {
            assert_eq!(*index, 0);
            assert_eq!(name, "false");
            assert_eq!(status.code(), Some(1));
        }
        other => panic!("expected Wait/Exit for stage 0, got {:?}", other),
    }
}

#[tokio::test]
async fn middle_stage_with_stdout_taken_fails_to_link() {
    let mut middle = OsProcess::new("tr", ["a-z", "A-Z"]);
    let _reader = middle.stdout_pipe().unwrap();

    let mut chain = Chain::command("echo", ["hi"])
        .pipe_process(middle)
        .pipe("cat", NO_ARGS);

    let err = with_timeout(chain.output()).await.unwrap_err();

    match err {
        PipechainError::Link {
            index,
            source: ProcessError::AlreadySet(_),
            ..
        } => assert_eq!(index, 1),
        other => panic!("expected Link error for stage 1, got {:?}", other),
    }
    // Nothing was started.
    assert!(chain.stages().iter().all(|s| !s.is_started()));
}

#[tokio::test]
async fn chain_streams_from_and_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "pear\napple\nfig\n").unwrap();

    let mut chain = Chain::command("cat", NO_ARGS)
        .pipe("sort", NO_ARGS)
        .stdin(Input::file(File::open(&input).unwrap()))
        .stdout(Output::file(File::create(&output).unwrap()));

    with_timeout(chain.start()).await.unwrap();
    with_timeout(chain.wait()).await.unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "apple\nfig\npear\n");
}

#[tokio::test]
async fn allerr_collects_stderr_from_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let errors = dir.path().join("errors.log");

    let mut chain = Chain::command("sh", ["-c", "echo first >&2"])
        .pipe("sh", ["-c", "cat >/dev/null; echo second >&2"])
        .allerr(Output::file(File::create(&errors).unwrap()));

    let out = with_timeout(chain.output()).await.unwrap();
    with_timeout(chain.wait()).await.unwrap();

    assert!(out.is_empty());
    let logged = fs::read_to_string(&errors).unwrap();
    assert!(logged.contains("first"), "missing first stage stderr: {logged:?}");
    assert!(logged.contains("second"), "missing last stage stderr: {logged:?}");
}

#[tokio::test]
async fn stderr_file_takes_only_the_last_stage() {
    let dir = tempfile::tempdir().unwrap();
    let all = dir.path().join("all.log");
    let last = dir.path().join("last.log");

    let mut chain = Chain::command("sh", ["-c", "echo first >&2"])
        .pipe("sh", ["-c", "cat >/dev/null; echo second >&2"])
        .allerr(Output::file(File::create(&all).unwrap()))
        .stderr(Output::file(File::create(&last).unwrap()));

    with_timeout(chain.start()).await.unwrap();
    with_timeout(chain.wait()).await.unwrap();

    assert_eq!(fs::read_to_string(&all).unwrap(), "first\n");
    assert_eq!(fs::read_to_string(&last).unwrap(), "second\n");
}

#[tokio::test]
async fn caller_pipes_feed_and_drain_the_chain() {
    let mut chain = Chain::command("cat", NO_ARGS).pipe("tr", ["a-z", "A-Z"]);
    let mut writer = chain.stdin_pipe().unwrap();
    let mut reader = chain.stdout_pipe().unwrap();

    with_timeout(chain.start()).await.unwrap();

    writer.write_all(b"quiet words\n").unwrap();
    drop(writer);

    let text = tokio::task::spawn_blocking(move || {
        let mut text = String::new();
        reader.read_to_string(&mut text).map(|_| text)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(text, "QUIET WORDS\n");
    with_timeout(chain.wait()).await.unwrap();
}

#[tokio::test]
async fn stderr_pipe_drains_the_last_stage() {
    let mut chain = Chain::command("echo", ["ignored"])
        .pipe("sh", ["-c", "cat >/dev/null; echo oops >&2"]);
    let mut reader = chain.stderr_pipe().unwrap();

    with_timeout(chain.start()).await.unwrap();

    let text = tokio::task::spawn_blocking(move || {
        let mut text = String::new();
        reader.read_to_string(&mut text).map(|_| text)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(text, "oops\n");
    with_timeout(chain.wait()).await.unwrap();
}

#[tokio::test]
async fn caller_pipes_after_start_are_rejected() {
    let mut chain = Chain::command("true", NO_ARGS);
    with_timeout(chain.start()).await.unwrap();

    let err = chain.stdout_pipe().unwrap_err();
    assert!(matches!(
        err,
        PipechainError::Link {
            index: 0,
            source: ProcessError::AlreadyStarted,
            ..
        }
    ));

    let err = chain.stderr_pipe().unwrap_err();
    assert!(matches!(
        err,
        PipechainError::Link {
            index: 0,
            source: ProcessError::AlreadyStarted,
            ..
        }
    ));

    with_timeout(chain.wait()).await.unwrap();
}

#[tokio::test]
async fn stderr_pipe_twice_is_rejected() {
    let mut chain = Chain::command("true", NO_ARGS).pipe("cat", NO_ARGS);
    let _reader = chain.stderr_pipe().unwrap();

    let err = chain.stderr_pipe().unwrap_err();

    assert!(matches!(
        err,
        PipechainError::Link {
            index: 1,
            source: ProcessError::AlreadySet("stderr"),
            ..
        }
    ));
}

#[tokio::test]
async fn abort_kills_stages_started_before_the_failure() {
    init_tracing();
    let mut chain = Chain::command("sleep", ["30"])
        .pipe("pipechain-no-such-command", NO_ARGS)
        .pipe("cat", NO_ARGS);

    let err = with_timeout(chain.output()).await.unwrap_err();

    match &err {
        PipechainError::Launch {
            index,
            source: ProcessError::Spawn(_),
            ..
        } => assert_eq!(*index, 1),
        other => panic!("expected Launch error for stage 1, got {:?}", other),
    }
    assert_eq!(chain.stage_state(0), Some(StageState::Completed));
    let status = chain.stage(0).unwrap().exit_status().unwrap();
    assert!(!status.success(), "sleep should have been killed");
}

#[tokio::test]
async fn lenient_launch_lets_downstream_see_eof() {
    let mut chain = Chain::command("pipechain-no-such-command", NO_ARGS)
        .pipe("cat", NO_ARGS)
        .options(ChainOptions {
            launch_failure: LaunchFailure::Lenient,
            kill_on_failure: true,
        });

    let out = with_timeout(chain.output()).await.unwrap();
    assert!(out.is_empty());

    let err = with_timeout(chain.wait()).await.unwrap_err();
    assert!(matches!(
        err,
        PipechainError::Wait {
            index: 0,
            source: ProcessError::NotStarted,
            ..
        }
    ));
}

#[tokio::test]
async fn cancellation_kills_a_running_stage() {
    let (source, token) = cancel_pair();
    let mut chain = Chain::command_with_cancel(token, "sleep", ["30"]);

    with_timeout(chain.start()).await.unwrap();
    source.cancel();
    let err = with_timeout(chain.wait()).await.unwrap_err();

    assert!(matches!(
        err,
        PipechainError::Wait {
            index: 0,
            source: ProcessError::Cancelled,
            ..
        }
    ));
    assert!(chain.stage(0).unwrap().exit_status().is_some());
}

#[tokio::test]
async fn cancellation_after_exit_reports_the_real_status() {
    let (source, token) = cancel_pair();
    let mut chain = Chain::command_with_cancel(token, "true", NO_ARGS);

    with_timeout(chain.start()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    source.cancel();

    with_timeout(chain.wait()).await.unwrap();
    assert!(chain.stage(0).unwrap().exit_status().unwrap().success());
}

#[tokio::test]
async fn cancelled_token_prevents_start() {
    let (source, token) = cancel_pair();
    source.cancel();
    let mut chain = Chain::command("true", NO_ARGS).pipe_with_cancel(token, "cat", NO_ARGS);

    let err = with_timeout(chain.output()).await.unwrap_err();

    assert!(matches!(
        err,
        PipechainError::Terminal {
            index: 1,
            source: ProcessError::Cancelled,
            ..
        }
    ));
    // `true` was started, then reaped because nothing would drain it.
    assert_eq!(chain.stage_state(0), Some(StageState::Completed));
}

#[tokio::test]
async fn lenient_launch_of_a_cancelled_stage_still_closes_its_pipe() {
    let (source, token) = cancel_pair();
    source.cancel();
    let mut chain = Chain::command_with_cancel(token, "true", NO_ARGS)
        .pipe("cat", NO_ARGS)
        .options(ChainOptions {
            launch_failure: LaunchFailure::Lenient,
            kill_on_failure: true,
        });

    let out = with_timeout(chain.output()).await.unwrap();
    assert!(out.is_empty());

    let err = with_timeout(chain.wait()).await.unwrap_err();
    assert!(matches!(
        err,
        PipechainError::Wait {
            index: 0,
            source: ProcessError::NotStarted,
            ..
        }
    ));
}

#[tokio::test]
async fn refused_start_drops_the_stream_slots() {
    let (source, token) = cancel_pair();
    source.cancel();
    let mut process = OsProcess::new("true", NO_ARGS).with_cancel(token);
    let mut reader = process.stdout_pipe().unwrap();

    assert!(matches!(process.start(), Err(ProcessError::Cancelled)));
    assert!(process.stdout_slot().is_none());

    // The write end is gone, so the reader hits EOF right away.
    let bytes = with_timeout(tokio::task::spawn_blocking(move || {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map(|_| bytes)
    }))
    .await
    .unwrap()
    .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn refused_capture_drops_the_stdin_slot() {
    let (source, token) = cancel_pair();
    source.cancel();
    let mut process = OsProcess::new("cat", NO_ARGS).with_cancel(token);
    let mut writer = process.stdin_pipe().unwrap();

    let err = with_timeout(process.combined_output()).await.unwrap_err();

    assert!(matches!(err, ProcessError::Cancelled));
    assert!(process.stdin_slot().is_none());
    // Nobody is left to read, so writing fails instead of blocking.
    assert!(writer.write_all(b"late").is_err());
}

#[tokio::test]
async fn non_zero_terminal_exit_keeps_captured_output() {
    let mut chain = Chain::command("echo", ["partial"]).pipe("sh", ["-c", "cat; exit 3"]);

    let err = with_timeout(chain.output()).await.unwrap_err();

    assert_eq!(err.stage_index(), Some(1));
    assert_eq!(err.captured_output(), Some(&b"partial\n"[..]));
    assert_eq!(err.exit_status().and_then(|s| s.code()), Some(3));

    // The cached terminal status is reported again by wait.
    let err = with_timeout(chain.wait()).await.unwrap_err();
    assert_eq!(err.stage_index(), Some(1));
}
