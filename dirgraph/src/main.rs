use clap::ArgMatches;
use commands::command_argument_builder;
use dirgraph::routes::{self, AppState};
use dirgraph_core::job::JobManager;
use dirgraph_core::{CorpusConfig, ScanConfig, print_banner};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("serve", primary_command)) => handle_serve(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

async fn handle_serve(sub_matches: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let bind = sub_matches.get_one::<String>("bind").unwrap();
    let corpus_dir = sub_matches.get_one::<String>("corpus-dir").unwrap();
    let corpus_url = sub_matches.get_one::<String>("corpus-url");
    let threads = sub_matches.get_one::<usize>("threads").unwrap_or(&64);
    let timeout = sub_matches.get_one::<u64>("timeout").unwrap_or(&10);
    let max_candidates = sub_matches.get_one::<usize>("max-candidates").unwrap_or(&50_000);

    let expanded_corpus_dir = shellexpand::tilde(corpus_dir);
    let corpus_root = PathBuf::from(expanded_corpus_dir.as_ref());

    let scan_config = ScanConfig {
        concurrency: *threads,
        timeout_secs: *timeout,
        max_candidates: *max_candidates,
        ..ScanConfig::default()
    };
    let mut corpus_config = CorpusConfig {
        root: corpus_root,
        ..CorpusConfig::default()
    };
    if let Some(url) = corpus_url {
        corpus_config.archive_url = url.clone();
    }

    let manager = JobManager::new(scan_config, corpus_config);
    let state = Arc::new(AppState { manager });
    let app = routes::router(state);

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", bind, e);
            std::process::exit(1);
        }
    };

    println!("dirgraph listening on http://{}", bind);
    println!("  POST   /api/scans              submit a target");
    println!("  DELETE /api/scans/:id          cancel a scan");
    println!("  GET    /api/scans/:id/events   follow a scan's event stream\n");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
