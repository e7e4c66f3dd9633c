use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    drk_launcher_lib::run().await
}
