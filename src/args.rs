use clap::Parser;

/// Runs the senate counting engine over every configured experiment and state,
/// tallies the elected candidates by party and writes the aggregated results to disk.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (list of state identifiers, optional) If present, restricts the sweep to the given
    /// states. The sweep covers every configured state when no identifier is given.
    #[clap(value_parser)]
    pub states: Vec<String>,

    /// (file path) The sweep configuration: state seat counts, experiment variants and
    /// the engine command.
    #[clap(short, long, value_parser, default_value = "states.json")]
    pub config: String,

    /// (file path) Where the aggregated results are written in JSON format.
    #[clap(short, long, value_parser, default_value = "out.json")]
    pub out: String,

    /// (file path) A reference results file in JSON format. If provided, the harness
    /// checks that the aggregated results match the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
