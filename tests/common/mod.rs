#![allow(dead_code)]

use pipechain::Chain;
use pipechain_test_utils::fake_process::{FakeEvent, FakeProcess, Journal};

/// Chain of `n` well-behaved fakes named `s0`, `s1`, ...
pub fn fake_chain(n: usize, journal: &Journal) -> Chain<FakeProcess> {
    assert!(n >= 1, "a chain needs at least one stage");
    let mut chain = Chain::new(FakeProcess::new("s0", journal));
    for i in 1..n {
        chain = chain.pipe_process(FakeProcess::new(&format!("s{i}"), journal));
    }
    chain
}

pub fn events(journal: &Journal) -> Vec<FakeEvent> {
    journal.lock().unwrap().clone()
}

pub fn started(name: &str) -> FakeEvent {
    FakeEvent::Started(name.to_string())
}

pub fn ran(name: &str) -> FakeEvent {
    FakeEvent::Ran(name.to_string())
}

pub fn waited(name: &str) -> FakeEvent {
    FakeEvent::Waited(name.to_string())
}

pub fn killed(name: &str) -> FakeEvent {
    FakeEvent::Killed(name.to_string())
}
