#[tokio::main]
async fn main() {
    aggregator::start(std::env::args()).await;
}
