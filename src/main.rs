#[tokio::main]
async fn main() {
    if let Err(e) = traffic_history::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
