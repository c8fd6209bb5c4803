use std::error::Error;

use clap::Parser;
use iconsnip::{
    args::MaskArgs, decode::decode, encode::ensure_dir, error::ErrorKind, logger, mask::MaskSet,
};

fn main() {
    if let Err(e) = real_main() {
        iconsnip::log!("error"; "{e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn Error>> {
    let args = MaskArgs::parse();
    logger::set_verbose(args.verbose);

    let shape = decode(&args.shape, ErrorKind::InvalidInput)?;
    iconsnip::debug!("mask"; "shape image is {}x{}", shape.width(), shape.height());
    let masks = MaskSet::from_shape_image(&shape, args.threshold)?;

    ensure_dir(&args.out)?;
    let (small, large) = masks.save(&args.out)?;
    iconsnip::log!("done"; "wrote {} and {}", small.display(), large.display());
    Ok(())
}
