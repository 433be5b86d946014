use lnclient::{BackendKind, InvoiceRequest, NodeClient, NodeConfig};
use tokio::fs;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lnclient=debug")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let backend: BackendKind = flag_value(&args, "--backend")
        .unwrap_or_else(|| "LndRest".to_string())
        .parse()?;
    let url = flag_value(&args, "--url").unwrap_or_else(|| "https://127.0.0.1:8080".to_string());

    let mut config = NodeConfig::new(url);
    if let Some(path) = flag_value(&args, "--macaroon") {
        config = config.with_macaroon(hex::encode(fs::read(path).await?));
    }
    if let Some(path) = flag_value(&args, "--tls-cert") {
        config = config.with_certificate(fs::read_to_string(path).await?);
    }
    if let Some(rune) = flag_value(&args, "--rune") {
        config = config.with_rune(rune);
    }
    if let Some(password) = flag_value(&args, "--password") {
        config = config.with_password(password);
    }

    let node = NodeClient::new(backend, &config)?;
    let info = node.get_info().await?;
    println!("{info:#?}");

    if let Some(amount) = flag_value(&args, "--invoice") {
        let invoice = node
            .create_invoice(&InvoiceRequest::new(amount.parse()?, "lnclient demo"))
            .await?;
        println!("{}", invoice.payment_request);
    }
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
}
