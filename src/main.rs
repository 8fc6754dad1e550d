#[tokio::main]
async fn main() -> anyhow::Result<()> {
    esextract_rs::run().await
}
