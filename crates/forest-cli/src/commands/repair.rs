use forest_core::Config;

use crate::common::{open_service, print_report, GlobalOpts};

pub fn run(force: bool, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let handle = opts.handle(&config)?;
    let mut service = open_service(&config)?;
    let report = service.repair_sequence(&handle, force)?;
    print_report(&report, opts)
}
