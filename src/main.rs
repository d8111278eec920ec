use std::rc::Rc;

use anyhow::Result;
use render3d::{
    init_logging, run_until_closed, start, AshDriver, GlfwPlatform, StartupConfig, TracingSink,
};
use tracing::info;

fn main() -> Result<()> {
    init_logging()?;

    let config = StartupConfig::from_build();
    let driver = Rc::new(AshDriver::load()?);
    let mut platform = GlfwPlatform::try_new()?;

    let context = start(driver, &mut platform, &config, Rc::new(TracingSink))?;
    info!(
        "Queue family {} ready for graphics and presentation",
        context.device().queue_family_index()
    );

    run_until_closed(&mut platform, config.poll_interval);

    // surface and device must go before the window
    drop(context);
    Ok(())
}
