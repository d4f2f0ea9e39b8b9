//! constcache CLI entry point

#[tokio::main]
async fn main() {
    if let Err(err) = constcache_cli::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
