mod cli;
mod logging;
mod pipeline;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
