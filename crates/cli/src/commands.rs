//! Clap command definition.
//!
//! ```text
//! roomq [options] <room-key> <query>
//! ```

use clap::{Arg, ArgAction, Command};

/// Build the command line.
pub fn build_cli() -> Command {
    Command::new("roomq")
        .about("Read configuration values from a replicated room")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .arg(
            Arg::new("room-key")
                .value_name("ROOM_KEY")
                .required(true)
                .help("Encoded room key (store identifier + secret)"),
        )
        .arg(
            Arg::new("query")
                .value_name("QUERY")
                .required(true)
                .help("Query expression, or NAME[:prop1,prop2,...] with --named-query"),
        )
        .arg(
            Arg::new("named-query")
                .short('n')
                .long("named-query")
                .help("Treat QUERY as a named query with optional property list")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("storage")
                .short('s')
                .long("storage")
                .value_name("PATH")
                .help("Persistent cache directory (default: temporary, removed on exit)"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("JSON output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("export")
                .short('e')
                .long("export")
                .help("Prefix shell assignments with `export`")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("blind")
                .short('b')
                .long("blind")
                .value_name("KEY")
                .help("Known blind peer key; may be repeated")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Print timestamped progress to stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print version")
                .action(ArgAction::Version),
        )
}
