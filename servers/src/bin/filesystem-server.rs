//! MCP stdio server exposing `list_files`.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toolrelay_servers::init_tracing();
    toolrelay_servers::filesystem::server().serve_stdio().await?;
    Ok(())
}
