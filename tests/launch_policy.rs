mod common;

use pipechain::errors::{PipechainError, ProcessError};
use pipechain::types::{ChainOptions, ChainPhase, LaunchFailure, StageState};
use pipechain::Chain;
use pipechain_test_utils::fake_process::{new_journal, FakeEvent, FakeProcess, Journal};
use pipechain_test_utils::init_tracing;

use common::{events, fake_chain, killed, ran, started, waited};

fn chain_with_broken_middle(journal: &Journal) -> Chain<FakeProcess> {
    Chain::new(FakeProcess::new("s0", journal))
        .pipe_process(FakeProcess::new("s1", journal).fail_start())
        .pipe_process(FakeProcess::new("s2", journal).output(b"tail"))
}

#[tokio::test]
async fn non_terminal_stages_start_in_order_before_terminal_runs() {
    init_tracing();
    let journal = new_journal();
    let mut chain = fake_chain(3, &journal);

    chain.output().await.unwrap();

    let log = events(&journal);
    let lifecycle: Vec<_> = log
        .into_iter()
        .filter(|e| !matches!(e, FakeEvent::Piped(_)))
        .collect();
    assert_eq!(lifecycle, vec![started("s0"), started("s1"), ran("s2")]);
    assert_eq!(chain.phase(), ChainPhase::TerminalInvoked);
    assert_eq!(chain.stage_state(0), Some(StageState::Started));
    assert_eq!(chain.stage_state(2), Some(StageState::Completed));
}

#[tokio::test]
async fn abort_policy_surfaces_launch_failure_and_reaps_started_stages() {
    init_tracing();
    let journal = new_journal();
    let mut chain = chain_with_broken_middle(&journal);

    let err = chain.combined_output().await.unwrap_err();

    match &err {
        PipechainError::Launch { index, name, source } => {
            assert_eq!(*index, 1);
            assert_eq!(name, "s1");
            assert!(matches!(source, ProcessError::Spawn(_)));
        }
        other => panic!("expected Launch error, got {:?}", other),
    }
    assert!(err.to_string().contains("unable to start command #1 (s1)"));

    let log = events(&journal);
    assert!(log.contains(&started("s0")));
    assert!(log.contains(&killed("s0")));
    assert!(log.contains(&waited("s0")));
    assert!(!log.contains(&ran("s2")), "terminal stage must not run after abort");
    assert_eq!(chain.stage_state(0), Some(StageState::Completed));
}

#[tokio::test]
async fn abort_without_cleanup_leaves_started_stages_alone() {
    let journal = new_journal();
    let mut chain = chain_with_broken_middle(&journal).options(ChainOptions {
        launch_failure: LaunchFailure::Abort,
        kill_on_failure: false,
    });

    let err = chain.start().await.unwrap_err();

    assert_eq!(err.stage_index(), Some(1));
    let log = events(&journal);
    assert!(log.contains(&started("s0")));
    assert!(!log.contains(&killed("s0")));
    assert_eq!(chain.stage_state(0), Some(StageState::Started));
}

#[tokio::test]
async fn lenient_policy_keeps_going_and_wait_reports_the_broken_stage() {
    init_tracing();
    let journal = new_journal();
    let mut chain = chain_with_broken_middle(&journal).options(ChainOptions {
        launch_failure: LaunchFailure::Lenient,
        kill_on_failure: true,
    });

    let out = chain.output().await.unwrap();
    assert_eq!(out, b"tail");
    assert!(events(&journal).contains(&ran("s2")));

    match chain.wait().await {
        Err(PipechainError::Wait {
            index,
            source: ProcessError::NotStarted,
            ..
        }) => assert_eq!(index, 1),
        other => panic!("expected Wait/NotStarted for stage 1, got {:?}", other),
    }
    assert_eq!(chain.stage_state(1), Some(StageState::Linked));
}

#[tokio::test]
async fn terminal_start_failure_cleans_up_upstream() {
    let journal = new_journal();
    let mut chain = Chain::new(FakeProcess::new("s0", &journal))
        .pipe_process(FakeProcess::new("last", &journal).fail_start());

    let err = chain.start().await.unwrap_err();

    match err {
        PipechainError::Terminal { index, ref name, .. } => {
            assert_eq!(index, 1);
            assert_eq!(name, "last");
        }
        ref other => panic!("expected Terminal error, got {:?}", other),
    }
    assert!(events(&journal).contains(&killed("s0")));
}

#[tokio::test]
async fn second_terminal_operation_is_rejected() {
    let journal = new_journal();
    let mut chain = fake_chain(2, &journal);
    chain.start().await.unwrap();

    match chain.output().await {
        Err(PipechainError::InvalidPhase { actual, .. }) => {
            assert_eq!(actual, ChainPhase::TerminalInvoked);
        }
        other => panic!("expected InvalidPhase, got {:?}", other),
    }
}

#[tokio::test]
async fn terminal_operation_accepts_a_prelinked_chain() {
    let journal = new_journal();
    let mut chain = fake_chain(2, &journal);
    chain.link().unwrap();

    chain.start().await.unwrap();

    let pipes = events(&journal)
        .into_iter()
        .filter(|e| matches!(e, FakeEvent::Piped(_)))
        .count();
    assert_eq!(pipes, 1);
    assert_eq!(chain.stage_state(1), Some(StageState::Started));
}
