#[tokio::main]
async fn main() {
    if let Err(err) = api_tester::rpc::server::run_stdio().await {
        eprintln!("api-tester: {}", err);
        std::process::exit(1);
    }
}
