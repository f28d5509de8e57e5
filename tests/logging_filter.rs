use pipechain::cli::LogLevel;
use pipechain::logging::build_filter;
use tracing_subscriber::filter::LevelFilter;

#[test]
fn default_level_is_warn() {
    assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::WARN));
    assert_eq!(build_filter(None, Some("  ")).max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn cli_level_wins_over_the_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("error"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn bare_env_level_is_accepted_in_any_case() {
    assert_eq!(build_filter(None, Some("INFO")).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(build_filter(None, Some("warning")).max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn env_directives_target_single_modules() {
    let filter = build_filter(None, Some("error,pipechain::chain=trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}
