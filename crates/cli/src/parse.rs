//! Convert clap matches into an [`Invocation`].

use std::path::PathBuf;

use clap::ArgMatches;
use roomq_executor::{Invocation, OutputOptions, QuerySpec};

/// Convert parsed arguments into an invocation.
///
/// Required arguments are enforced by clap, so a missing one here means the
/// command definition and this function disagree.
pub fn matches_to_invocation(matches: &ArgMatches) -> Result<Invocation, String> {
    let locator = matches
        .get_one::<String>("room-key")
        .cloned()
        .ok_or("missing room key")?;
    let query = matches
        .get_one::<String>("query")
        .ok_or("missing query")?;
    let named = matches.get_flag("named-query");

    Ok(Invocation {
        locator,
        query: QuerySpec::parse(query, named),
        storage: matches.get_one::<String>("storage").map(PathBuf::from),
        blind_peers: matches
            .get_many::<String>("blind")
            .map(|keys| keys.cloned().collect())
            .unwrap_or_default(),
        output: OutputOptions {
            json: matches.get_flag("json"),
            export: matches.get_flag("export"),
        },
        debug: matches.get_flag("debug"),
    })
}
