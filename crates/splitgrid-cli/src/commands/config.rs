use splitgrid_core::SchedulerConfig;

pub fn show(config: &SchedulerConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
