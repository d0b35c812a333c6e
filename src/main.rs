//! Binary entry point; all wiring lives in the library crate.

use tracing::instrument;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  vocazoo_backend::run().await
}
