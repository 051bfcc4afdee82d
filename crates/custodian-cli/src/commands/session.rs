use anyhow::Result;
use custodian_core::AppConfig;
use custodian_link::{ConsoleLink, HttpLink};
use custodian_observe::Observer;
use custodian_ui::run_console;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn run_session(cwd: &Path, cfg: &AppConfig, verbose: bool, run_boot: bool) -> Result<()> {
    let mut observer = Observer::new(cwd)?;
    observer.set_verbose(verbose);
    observer.verbose_log(&format!("console linked to {}", cfg.link.base_url));
    let link: Arc<dyn ConsoleLink> = Arc::new(HttpLink::new(cfg.link.clone())?);
    run_console(cfg, link, observer, run_boot)
}
