#[tokio::main]
async fn main() -> anyhow::Result<()> {
    prismvis::node::run_cli().await
}
