use current_platform::CURRENT_PLATFORM;
use strum::VariantArray;

use crate::extract::Extractor;
use crate::geometry::SizeClass;
use crate::mask::{LARGE_MASK_FILE, LARGE_MASK_SIDE, SMALL_MASK_FILE, SMALL_MASK_SIDE};

pub fn version_string() -> String {
    let cpu = CURRENT_PLATFORM.split('-').next().unwrap_or("unknown");
    let version = env!("CARGO_PKG_VERSION");
    let repo = env!("CARGO_PKG_REPOSITORY");

    format!("{version} {cpu} {repo}")
}

/// Text shown after the option list of `iconsnip-extract --help`
pub fn extract_after_help() -> String {
    let extractor = Extractor::default();
    let mut text = String::from("Size classes:\n");
    for class in SizeClass::VARIANTS {
        let (mask_file, mask_side) = mask_for(*class);
        let output = extractor.output_side(*class);
        text.push_str(&format!(
            "  {:7} {mask_file} ({mask_side}x{mask_side}) -> {output}x{output} px\n",
            class.to_string()
        ));
    }
    text.push_str("\nFlags override values from --config, which override the defaults.");
    text
}

fn mask_for(class: SizeClass) -> (&'static str, u32) {
    match class {
        SizeClass::Small => (SMALL_MASK_FILE, SMALL_MASK_SIDE),
        SizeClass::Large => (LARGE_MASK_FILE, LARGE_MASK_SIDE),
    }
}

/// Text shown after the option list of `iconsnip-mask --help`
pub fn mask_after_help() -> String {
    format!(
        "Writes {SMALL_MASK_FILE} ({SMALL_MASK_SIDE}x{SMALL_MASK_SIDE}) and \
         {LARGE_MASK_FILE} ({LARGE_MASK_SIDE}x{LARGE_MASK_SIDE}) into the output directory.\n\
         Transparent shape images are read by alpha, opaque ones by brightness."
    )
}
