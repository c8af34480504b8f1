#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bazaar_api::server::run().await
}
