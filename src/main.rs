use anyhow::Context;

fn main() -> anyhow::Result<()> {
    snaptext::run().context("SnapText terminated with an error")?;
    Ok(())
}
