use roomcast::{App, ConfigBuilder};

#[tokio::main]
async fn main() {
    let config = match ConfigBuilder::new().from_env().build() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("invalid configuration: {error}");
            std::process::exit(1);
        }
    };

    roomcast::init_tracing_with_config(&config);

    if let Err(error) = App::with_config(config).serve().await {
        tracing::error!(%error, "server exited with error");
        std::process::exit(1);
    }
}
