pub mod candidates;
pub mod config;
pub mod corpus;
pub mod event;
pub mod graph;
pub mod index;
pub mod job;
pub mod select;

pub use config::{CorpusConfig, ScanConfig};
pub use event::JobEvent;
pub use job::{JobError, JobManager, JobState};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
     _ _                          _
  __| (_)_ __ __ _ _ __ __ _ _ __| |__
 / _` | | '__/ _` | '__/ _` | '_ \ '_ \
| (_| | | | | (_| | | | (_| | |_) | | | |
 \__,_|_|_|  \__, |_|  \__,_| .__/|_| |_|
             |___/          |_|
"#;
    println!("{}", banner.cyan());
    println!(
        "{} {}",
        "dirgraph".bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!("{}\n", "map what the server never meant to show you".dimmed());
}
