use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Walk a participant's day window and upload landed days
    Sync {
        #[arg(long, help = "Participant id")]
        participant: String,

        #[arg(long, help = "Vendor account email, overrides the directory record")]
        email: Option<String>,

        #[arg(long, help = "IANA timezone for local timestamp columns")]
        timezone: Option<String>,

        #[arg(long, help = "First day of the window, overrides the directory record")]
        start_date: Option<String>,

        #[arg(long, help = "Last day of the window, defaults to today (UTC)")]
        target_date: Option<String>,

        #[arg(long, help = "Compute and report without uploading or persisting anything")]
        dry_run: bool,

        #[arg(long, help = "Use the deterministic fixture provider instead of the vendor API")]
        fixture: bool,

        #[arg(long, help = "Directory for the parquet dataset and raw archive")]
        data_root: Option<String>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Fetch one day's raw vendor payload
    Fetch {
        #[arg(long, help = "Vendor account email")]
        email: String,

        #[arg(long, help = "Day to fetch")]
        date: String,

        #[arg(long, help = "Use the deterministic fixture provider instead of the vendor API")]
        fixture: bool,

        #[arg(
            long,
            help = "If specified, writes the payload to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Flatten and normalize a local payload file and show the resulting column shapes
    Preview {
        #[arg(long, help = "Path to a JSON payload file (one day's raw vendor payload)")]
        file: String,

        #[arg(long, help = "IANA timezone for local timestamp columns")]
        timezone: Option<String>,

        #[arg(long, help = "Participant id stamped onto the records")]
        participant: Option<String>,
    },
    /// Show a participant's stored watermark
    Watermark {
        #[arg(long, help = "Participant id")]
        participant: String,

        #[arg(
            long,
            help = "If set, prints the watermark as JSON instead of a table"
        )]
        json: bool,
    },
}
