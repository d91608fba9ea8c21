use forest_core::Config;

use crate::common::{open_service, print_report, GlobalOpts};

pub fn run(opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let handle = opts.handle(&config)?;
    let service = open_service(&config)?;
    print_report(&service.status(&handle)?, opts)
}
