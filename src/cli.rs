use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "WAF evasion variant generator and fingerprinter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate evasion variants for one or more payloads
    Generate {
        /// Payload to transform (repeatable)
        #[arg(short = 'p', long = "payload", conflicts_with = "file")]
        payloads: Vec<String>,

        /// Newline-delimited payload file (# comments and blank lines skipped)
        #[arg(short = 'f', long)]
        file: Option<String>,

        /// Attack type (xss, sqli, unix-command-injection, path-traversal, ...)
        #[arg(short = 'a', long, default_value = "generic")]
        attack: String,

        /// Evasion level: basic, medium, advanced
        #[arg(short = 'l', long, default_value = "basic")]
        level: String,

        /// Only run these techniques, in this order (repeatable)
        #[arg(short = 't', long = "technique")]
        techniques: Vec<String>,

        /// Order techniques for a known WAF without probing (e.g. cloudflare)
        #[arg(long)]
        waf: Option<String>,

        /// Target URL, used with --fingerprint
        #[arg(long)]
        target: Option<String>,

        /// Fingerprint the target's WAF first and order techniques for it
        #[arg(long, default_value_t = false)]
        fingerprint: bool,

        /// Fixed seed for randomized techniques
        #[arg(long)]
        seed: Option<u64>,

        /// Per-request timeout in seconds (1-9)
        #[arg(long, default_value_t = 5_u64)]
        timeout: u64,

        /// Load run settings from a JSON file instead of flags
        #[arg(long, value_name = "FILE")]
        config: Option<String>,

        /// Output file (.jsonl or .csv); prints to stdout when omitted
        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Fingerprint the WAF in front of one or more targets
    Fingerprint {
        /// Target URLs
        #[arg(required = true)]
        targets: Vec<String>,

        /// Per-request timeout in seconds (1-9)
        #[arg(long, default_value_t = 5_u64)]
        timeout: u64,

        /// Targets fingerprinted concurrently
        #[arg(short = 'c', long, default_value_t = 4_usize)]
        concurrency: usize,

        /// Write fingerprint(s) as JSON
        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// List techniques, optionally for one attack type and WAF
    Techniques {
        /// Attack type to list applicable techniques for
        #[arg(short = 'a', long)]
        attack: Option<String>,

        /// Show the order used against this WAF
        #[arg(long)]
        waf: Option<String>,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
