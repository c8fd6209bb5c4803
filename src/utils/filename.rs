use crate::geometry::SizeClass;

/// Final icon file name, e.g. `icon_007_large_157x157.png`.
/// `index` is 1-based and padded to three digits so that files list in reading order.
pub fn icon_file_name(index: usize, size_class: SizeClass, side: u32) -> String {
    format!("icon_{index:03}_{size_class}_{side}x{side}.png")
}

/// The same icon put on a replacement background, e.g. `icon_007_large_157x157_composed.png`
pub fn composed_file_name(index: usize, size_class: SizeClass, side: u32) -> String {
    format!("icon_{index:03}_{size_class}_{side}x{side}_composed.png")
}

/// Name of an intermediate image written for diagnostics, e.g. `icon_007_large.png`
pub fn stage_file_name(index: usize, size_class: SizeClass) -> String {
    format!("icon_{index:03}_{size_class}.png")
}
