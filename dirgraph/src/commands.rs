use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("dirgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("dirgraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("serve")
                .about(
                    "Run the scan server: submit targets, stream events, fetch the \
                discovered site graph.",
                )
                .arg(
                    arg!(-b --"bind" <ADDR>)
                        .required(false)
                        .help("Address and port to listen on")
                        .default_value("127.0.0.1:8450"),
                )
                .arg(
                    arg!(--"corpus-dir" <PATH>)
                        .required(false)
                        .help("Directory the wordlist corpus is stored in")
                        .default_value("~/.config/dirgraph/wordlists"),
                )
                .arg(
                    arg!(--"corpus-url" <URL>)
                        .required(false)
                        .help("Archive the wordlist corpus is fetched from on first use"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async worker 'threads' in each job's pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("64"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-candidates" <NUM>)
                        .required(false)
                        .help("Ceiling on the candidate set size per scan")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50000"),
                ),
        )
}
