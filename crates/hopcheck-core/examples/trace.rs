//! Trace the path to a target host and print each hop as it is discovered.
//!
//! Requires the `CAP_NET_RAW` capability on Linux:
//!
//! `cargo build --example trace && sudo target/debug/examples/trace example.com`
use anyhow::anyhow;
use hopcheck_core::Builder;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let target = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: trace <target>"))?;
    Builder::new(target).build()?.run_with(|record| {
        if record.is_terminal() {
            println!("{}", record.display_name);
        } else if record.succeeded {
            println!(
                "{:>3}  {:>10}  {}",
                record.hop,
                record.elapsed_ms(),
                record.display_name
            );
        } else {
            println!("{:>3}  {:>10}  {}", record.hop, "*", record.display_name);
        }
    })?;
    Ok(())
}
