#[tokio::main]
async fn main() -> std::process::ExitCode {
    match medportal::run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("medportal: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
