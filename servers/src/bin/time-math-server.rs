//! MCP stdio server exposing `add_numbers`, `get_echo` and `get_current_time`.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toolrelay_servers::init_tracing();
    toolrelay_servers::time_math::server().serve_stdio().await?;
    Ok(())
}
