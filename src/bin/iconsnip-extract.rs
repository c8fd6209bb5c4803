use std::error::Error;

use clap::Parser;
use iconsnip::{args::ExtractArgs, logger, mask::MaskSet, pipeline::Pipeline};

fn main() {
    if let Err(e) = real_main() {
        iconsnip::log!("error"; "{e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn Error>> {
    let args = ExtractArgs::parse();
    logger::set_verbose(args.verbose);

    let config = args.config()?;
    let masks = MaskSet::load(&args.small_mask, &args.large_mask)?;
    let mut pipeline = Pipeline::new(config, masks);
    if let Some(background) = &args.background {
        pipeline = pipeline.load_backdrop(background)?;
    }
    pipeline.execute(&args.screenshot, &args.out, args.debug_dir.as_deref())?;
    Ok(())
}
