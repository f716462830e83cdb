use std::path::PathBuf;

use app::config::Overrides;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Backend base URL, overrides NUTRIVAULT_API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Quiet time before a typed query is searched
    #[arg(long)]
    debounce_ms: Option<u64>,

    #[arg(long)]
    min_query_len: Option<usize>,

    /// Where exported PDF reports are written
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    app::start_app(Overrides {
        api_url: args.api_url,
        debounce_ms: args.debounce_ms,
        min_query_len: args.min_query_len,
        export_dir: args.export_dir,
    })
    .await
}
