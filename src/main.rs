#[tokio::main]
async fn main() {
    if let Err(e) = reportgen_lib::run().await {
        eprintln!("reportgen: {e}");
        std::process::exit(1);
    }
}
