use crate::CLAP_STYLING;
use clap::{arg, command};
use lexis_core::config::DEFAULT_CONFIG_PATH;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("lexis")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("lexis")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log more (-v info, -vv debug); RUST_LOG takes precedence")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("extract")
                .about(
                    "Walk a book's catalog and export every entry to a spreadsheet with a \
                single Name column.",
                )
                .arg(
                    arg!(-b --"book" <BOOK>)
                        .required(true)
                        .help("Book detail page URL (…/bookdetail?bookid=R123) or a bare book id"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Output file (default: <book title>.<format> in the current directory)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format: xlsx, csv, json (default: from --output, then config)")
                        .value_parser(["xlsx", "csv", "json"]),
                )
                .arg(
                    arg!(--"name" <TITLE>)
                        .required(false)
                        .help("Use this title instead of reading it from the book page"),
                )
                .arg(
                    arg!(--"base-url" <URL>)
                        .required(false)
                        .help("Catalog API base; the book id and /catalog are appended")
                        .value_parser(clap::value_parser!(url::Url)),
                )
                .arg(
                    arg!(--"page-size" <NUM>)
                        .required(false)
                        .help("Children requested per page")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"retries" <NUM>)
                        .required(false)
                        .help("Attempts per page request, including the first")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"retry-interval" <MS>)
                        .required(false)
                        .help("Pause between attempts in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Stop descending this many levels below the top of the catalog")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"branch-policy" <POLICY>)
                        .required(false)
                        .help(
                            "Which hasChild flag means 'descend': observed descends on N \
                        (what the site's own script does), corrected descends on Y",
                        )
                        .value_parser(["observed", "corrected"]),
                )
                .arg(
                    arg!(--"cookie" <COOKIE>)
                        .required(false)
                        .help("Cookie header copied from a logged-in browser session"),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help(format!("Settings file (default: {})", DEFAULT_CONFIG_PATH)),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Do not show the spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("init")
                .about("Writes a settings file with every option at its default")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the settings file")
                        .default_value(DEFAULT_CONFIG_PATH),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing settings file")
                        .required(false),
                ),
        )
}
