//! Version command - Print version information.

use anyhow::Result;

pub async fn execute() -> Result<()> {
    println!("squad {}", env!("CARGO_PKG_VERSION"));
    let providers = if cfg!(feature = "bedrock") {
        "openai, bedrock"
    } else {
        "openai"
    };
    println!("providers: {}", providers);
    Ok(())
}
