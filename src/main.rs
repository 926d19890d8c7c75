#[tokio::main]
async fn main() {
    if let Err(e) = chatcoach_lib::run().await {
        log::error!("{}", e);
        eprintln!("chatcoach: {}", e);
        std::process::exit(1);
    }
}
