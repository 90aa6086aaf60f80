#[tokio::main]
async fn main() -> anyhow::Result<()> {
    edrs_lib::run().await
}
